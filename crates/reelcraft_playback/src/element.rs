//! Host media primitives the synchronizer drives.

use crate::error::Result;
use reelcraft_core::types::{MediaKind, TimeUs};
use serde::Serialize;
use uuid::Uuid;

/// One playable media element (a video surface or an audio player).
///
/// Positions are in the element's own media time.
pub trait MediaElement {
    fn load(&mut self, url: &str) -> Result<()>;
    fn seek(&mut self, position: TimeUs) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn position(&self) -> Result<TimeUs>;
    fn set_volume(&mut self, volume: f64) -> Result<()>;
    fn set_muted(&mut self, muted: bool) -> Result<()>;
}

/// Creates elements. Dropping an element disposes it.
pub trait MediaBackend {
    type Element: MediaElement;

    fn create_element(&mut self, kind: MediaKind) -> Result<Self::Element>;
}

/// What the preview surface shows behind the overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PreviewContent {
    #[default]
    Empty,
    Video { clip_id: Uuid, url: String },
    Image { clip_id: Uuid, url: String },
}
