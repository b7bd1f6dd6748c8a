//! Hand-off of a committed timeline to an external renderer.

use crate::error::Result;
use reelcraft_core::snapshot::RenderRequest;
use std::path::{Path, PathBuf};
use tracing::info;

const EXTENSION: &str = "reelcraft.json";

/// Receives render requests. The engine knows nothing about what happens next.
pub trait Exporter {
    /// Returns where the request was delivered.
    fn export(&self, request: &RenderRequest) -> Result<PathBuf>;
}

/// Writes the request as pretty-printed JSON for a renderer to pick up.
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    path: PathBuf,
}

impl JsonFileExporter {
    /// Appends `.reelcraft.json` to `path` if not already present.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: ensure_extension(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Exporter for JsonFileExporter {
    fn export(&self, request: &RenderRequest) -> Result<PathBuf> {
        let json = request.to_json_pretty()?;
        std::fs::write(&self.path, json)?;
        info!(path = %self.path.display(), clips = request.clips.len(), "render request written");
        Ok(self.path.clone())
    }
}

/// Read a render request written by [`JsonFileExporter`].
pub fn load_request(path: impl AsRef<Path>) -> Result<RenderRequest> {
    let data = std::fs::read_to_string(path.as_ref())?;
    Ok(RenderRequest::from_json_str(&data)?)
}

fn ensure_extension(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    if name.ends_with(&format!(".{EXTENSION}")) {
        path.to_path_buf()
    } else {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(EXTENSION);
        path.with_file_name(name)
    }
}
