use crate::error::{MediaError, Result};
use crate::probe::{MediaMetadata, Prober};
use reelcraft_core::types::TimeUs;
use serde::Deserialize;
use std::future::Future;
use tokio::process::Command;
use tracing::debug;

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Prober
// ---------------------------------------------------------------------------

/// Probes media with the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: String,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::with_binary("ffprobe")
    }
}

impl FfprobeProber {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Prober for FfprobeProber {
    fn probe(&self, url: &str) -> impl Future<Output = Result<MediaMetadata>> + Send + 'static {
        let binary = self.binary.clone();
        let url = url.to_string();
        async move {
            let output = Command::new(&binary)
                .args([
                    "-v",
                    "quiet",
                    "-print_format",
                    "json",
                    "-show_format",
                    "-show_streams",
                ])
                .arg(&url)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| MediaError::ProbeExec(e.to_string()))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(MediaError::ProbeFailed(format!("{url}: {}", stderr.trim())));
            }

            let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
            let metadata = parse_probe_output(&probe);
            debug!(url = %url, duration = %metadata.duration, "probed");
            Ok(metadata)
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Container duration, falling back to the longest stream; dimensions of the
/// first video stream. Anything unreadable is zero.
fn parse_probe_output(probe: &FfprobeOutput) -> MediaMetadata {
    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let duration = parse_seconds(probe.format.duration.as_deref())
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| parse_seconds(s.duration.as_deref()))
                .max()
        })
        .unwrap_or(TimeUs::ZERO);

    MediaMetadata {
        duration,
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
    }
}

fn parse_seconds(raw: Option<&str>) -> Option<TimeUs> {
    raw.and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(TimeUs::from_seconds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
