use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::types::*;
use tracing::{debug, info};
use uuid::Uuid;

/// Clip fields that are edited directly rather than through placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipField {
    Volume,
    Opacity,
}

/// Clips under the play-head, grouped by the kind of track they sit on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveClips<'a> {
    pub main: Option<&'a Clip>,
    pub overlays: Vec<&'a Clip>,
    pub audio: Vec<&'a Clip>,
}

impl Timeline {
    /// Empty timeline with one track of each kind.
    pub fn new(config: &EngineConfig) -> Self {
        let mut timeline = Self {
            overlay_tracks: vec![],
            main_tracks: vec![],
            audio_tracks: vec![],
            clips: vec![],
            duration: config.initial_duration,
            extent_margin: config.extent_margin,
        };
        timeline.add_track(TrackKind::Overlay);
        timeline.add_track(TrackKind::Main);
        timeline.add_track(TrackKind::Audio);
        timeline
    }

    // -----------------------------------------------------------------------
    // Tracks
    // -----------------------------------------------------------------------

    pub fn tracks_of(&self, kind: TrackKind) -> &[Track] {
        match kind {
            TrackKind::Overlay => &self.overlay_tracks,
            TrackKind::Main => &self.main_tracks,
            TrackKind::Audio => &self.audio_tracks,
        }
    }

    fn tracks_of_mut(&mut self, kind: TrackKind) -> &mut Vec<Track> {
        match kind {
            TrackKind::Overlay => &mut self.overlay_tracks,
            TrackKind::Main => &mut self.main_tracks,
            TrackKind::Audio => &mut self.audio_tracks,
        }
    }

    /// Append a track of `kind` with the next sequential display name.
    pub fn add_track(&mut self, kind: TrackKind) -> Uuid {
        let tracks = self.tracks_of_mut(kind);
        let track = Track::new(kind, format!("{} {}", kind.label(), tracks.len() + 1));
        let id = track.id;
        info!(track = %id, name = %track.name, "track added");
        tracks.push(track);
        id
    }

    /// Overlays first, then main, then audio. This is the vertical stacking order.
    pub fn flattened_tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.overlay_tracks
            .iter()
            .chain(self.main_tracks.iter())
            .chain(self.audio_tracks.iter())
    }

    pub fn track(&self, track_id: Uuid) -> Option<&Track> {
        self.flattened_tracks().find(|t| t.id == track_id)
    }

    pub fn track_row_index(&self, track_id: Uuid) -> Option<usize> {
        self.flattened_tracks().position(|t| t.id == track_id)
    }

    pub fn track_at_row(&self, row: usize) -> Option<&Track> {
        self.flattened_tracks().nth(row)
    }

    pub fn track_count(&self) -> usize {
        self.overlay_tracks.len() + self.main_tracks.len() + self.audio_tracks.len()
    }

    /// First track of the kind an asset of `media` lands on by default.
    pub fn default_track_for(&self, media: MediaKind) -> Option<&Track> {
        self.tracks_of(media.default_track_kind()).first()
    }

    // -----------------------------------------------------------------------
    // Clips
    // -----------------------------------------------------------------------

    pub fn clip(&self, clip_id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn clip_mut(&mut self, clip_id: Uuid) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    pub fn contains_clip(&self, clip_id: Uuid) -> bool {
        self.clip(clip_id).is_some()
    }

    /// Clips on a track sorted by start time.
    pub fn clips_on_track(&self, track_id: Uuid) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.iter().filter(|c| c.track_id == track_id).collect();
        clips.sort_by_key(|c| c.start);
        clips
    }

    /// Set volume or opacity, clamped to `[0, 1]`.
    pub fn set_field(&mut self, clip_id: Uuid, field: ClipField, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(CoreError::InvalidOperation(format!(
                "{field:?} must be a finite number"
            )));
        }
        let clip = self.clip_mut(clip_id).ok_or(CoreError::ClipNotFound(clip_id))?;
        let value = value.clamp(0.0, 1.0);
        match field {
            ClipField::Volume => clip.volume = value,
            ClipField::Opacity => clip.opacity = value,
        }
        debug!(clip = %clip_id, ?field, value, "clip field set");
        Ok(())
    }

    /// Remove a clip by its id. Returns the removed clip.
    pub fn remove_clip(&mut self, clip_id: Uuid) -> Result<Clip> {
        let pos = self
            .clips
            .iter()
            .position(|c| c.id == clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let clip = self.clips.remove(pos);
        info!(clip = %clip_id, name = %clip.name, "clip removed");
        Ok(clip)
    }

    // -----------------------------------------------------------------------
    // Extent
    // -----------------------------------------------------------------------

    pub fn furthest_end(&self) -> TimeUs {
        self.clips.iter().map(Clip::end).max().unwrap_or(TimeUs::ZERO)
    }

    /// Grow `duration` to `end + margin` when `end` passes it. Never shrinks.
    pub fn grow_extent_if_needed(&mut self, end: TimeUs) -> bool {
        if end > self.duration {
            self.duration = end + self.extent_margin;
            debug!(duration = %self.duration, "timeline extent grown");
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Playback queries
    // -----------------------------------------------------------------------

    /// Clips whose span contains `t`. At most one main clip is reported:
    /// the first in track order, earliest start on ties.
    pub fn live_at(&self, t: TimeUs) -> LiveClips<'_> {
        let mut live = LiveClips::default();
        for track in self.flattened_tracks() {
            for clip in self.clips_on_track(track.id) {
                if !clip.contains(t) {
                    continue;
                }
                match track.kind {
                    TrackKind::Main => {
                        if live.main.is_none() {
                            live.main = Some(clip);
                        }
                    }
                    TrackKind::Overlay => live.overlays.push(clip),
                    TrackKind::Audio => live.audio.push(clip),
                }
            }
        }
        live
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Pairs of clips that overlap on the same track.
    pub fn overlapping_pairs(&self) -> Vec<(Uuid, Uuid)> {
        let mut pairs = Vec::new();
        for track in self.flattened_tracks() {
            let clips = self.clips_on_track(track.id);
            for (i, a) in clips.iter().enumerate() {
                for b in &clips[i + 1..] {
                    if a.overlaps(b) {
                        pairs.push((a.id, b.id));
                    }
                }
            }
        }
        pairs
    }

    pub fn check_no_overlap(&self) -> Result<()> {
        if self.overlapping_pairs().is_empty() {
            Ok(())
        } else {
            Err(CoreError::OverlapDetected)
        }
    }

    /// Clips whose track is missing or does not accept their media kind.
    pub fn misplaced_clips(&self) -> Vec<Uuid> {
        self.clips
            .iter()
            .filter(|c| match self.track(c.track_id) {
                Some(track) => !track.kind.accepts(c.kind),
                None => true,
            })
            .map(|c| c.id)
            .collect()
    }
}
