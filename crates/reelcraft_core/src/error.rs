use crate::types::{MediaKind, TrackKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(uuid::Uuid),

    #[error("Track not found: {0}")]
    TrackNotFound(uuid::Uuid),

    #[error("{media:?} media cannot be placed on a {track:?} track")]
    IncompatibleTrack { media: MediaKind, track: TrackKind },

    #[error("No {0:?} track available")]
    NoTrackOfKind(TrackKind),

    #[error("Overlap detected")]
    OverlapDetected,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("No clip selected")]
    NothingSelected,
}

pub type Result<T> = std::result::Result<T, CoreError>;
