use reelcraft_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to execute ffprobe: {0}")]
    ProbeExec(String),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("probe timed out")]
    ProbeTimedOut,

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, MediaError>;
