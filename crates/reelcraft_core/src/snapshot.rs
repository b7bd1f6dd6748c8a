//! Committed timeline snapshot handed to an external renderer.

use crate::error::{CoreError, Result};
use crate::overlay::{OverlayTransform, OverlayTransformStore};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderRequest {
    /// All tracks in stacking order (overlays, main, audio).
    pub tracks: Vec<Track>,
    pub clips: Vec<Clip>,
    pub video_duration: TimeUs,
    #[serde(default)]
    pub overlay_transforms: BTreeMap<Uuid, OverlayTransform>,
}

impl RenderRequest {
    pub fn from_parts(timeline: &Timeline, overlays: &OverlayTransformStore) -> Self {
        let mut clips = timeline.clips.clone();
        clips.sort_by_key(|c| (timeline.track_row_index(c.track_id), c.start));
        Self {
            tracks: timeline.flattened_tracks().cloned().collect(),
            clips,
            video_duration: timeline.duration,
            overlay_transforms: overlays.snapshot(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild a timeline from the snapshot, regrouping tracks by kind.
    pub fn to_timeline(&self, extent_margin: TimeUs) -> Result<Timeline> {
        let mut timeline = Timeline {
            overlay_tracks: vec![],
            main_tracks: vec![],
            audio_tracks: vec![],
            clips: self.clips.clone(),
            duration: self.video_duration,
            extent_margin,
        };
        for track in &self.tracks {
            if timeline.track(track.id).is_some() {
                return Err(CoreError::InvalidOperation(format!("duplicate track id {}", track.id)));
            }
            match track.kind {
                TrackKind::Overlay => timeline.overlay_tracks.push(track.clone()),
                TrackKind::Main => timeline.main_tracks.push(track.clone()),
                TrackKind::Audio => timeline.audio_tracks.push(track.clone()),
            }
        }
        Ok(timeline)
    }
}
