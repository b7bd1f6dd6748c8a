use reelcraft_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Media element error: {0}")]
    Element(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
