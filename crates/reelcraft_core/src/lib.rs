pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod keyboard;
pub mod overlay;
pub mod placement;
pub mod snapshot;
pub mod timeline;
pub mod timer;
pub mod types;
