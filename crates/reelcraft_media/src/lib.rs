pub mod error;
pub mod export;
pub mod ffprobe;
pub mod probe;
