//! Collision-aware clip placement ("ripple" insertion).
//!
//! [`plan_insertion`] is pure and is what drag previews call on every pointer
//! move. The `Timeline` methods below are the only way committed clips get
//! placed or moved; they apply any ripple they plan, so callers can't forget to.

use crate::error::{CoreError, Result};
use crate::types::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where an insertion lands and which clips have to make room.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub time: TimeUs,
    pub should_ripple: bool,
    /// Clips pushed forward by `shift`, in start order.
    pub affected: Vec<Uuid>,
    pub shift: TimeUs,
}

impl Placement {
    fn at(time: TimeUs) -> Self {
        Self {
            time,
            should_ripple: false,
            affected: vec![],
            shift: TimeUs::ZERO,
        }
    }
}

/// Decide where a clip of `duration` requested at `requested` on `track_id` goes.
///
/// Landing strictly inside a clip snaps to that clip's start and pushes it and
/// everything after it. Landing in a gap that is too short pushes the next clip
/// onward. Otherwise the clip goes exactly where requested.
pub fn plan_insertion(
    timeline: &Timeline,
    track_id: Uuid,
    requested: TimeUs,
    duration: TimeUs,
    exclude: Option<Uuid>,
) -> Placement {
    let requested = requested.max(TimeUs::ZERO);
    let clips: Vec<&Clip> = timeline
        .clips_on_track(track_id)
        .into_iter()
        .filter(|c| Some(c.id) != exclude)
        .collect();

    if let Some(host) = clips.iter().find(|c| c.strictly_contains(requested)) {
        let snapped = host.start;
        return ripple_from(&clips, snapped, snapped, duration);
    }

    match clips.iter().find(|c| c.start >= requested) {
        Some(next) if next.start - requested >= duration => Placement::at(requested),
        Some(next) => ripple_from(&clips, requested, next.start, duration),
        None => Placement::at(requested),
    }
}

fn ripple_from(clips: &[&Clip], time: TimeUs, from: TimeUs, shift: TimeUs) -> Placement {
    Placement {
        time,
        should_ripple: true,
        affected: clips.iter().filter(|c| c.start >= from).map(|c| c.id).collect(),
        shift,
    }
}

impl Timeline {
    /// Shift every affected clip by the placement's shift, then grow the extent.
    pub fn apply_ripple(&mut self, placement: &Placement) {
        if !placement.should_ripple {
            return;
        }
        for clip in self.clips.iter_mut() {
            if placement.affected.contains(&clip.id) {
                clip.start += placement.shift;
            }
        }
        info!(
            count = placement.affected.len(),
            shift = %placement.shift,
            "ripple applied"
        );
        let end = self.furthest_end();
        self.grow_extent_if_needed(end);
    }

    /// Place a new clip at (or near) `requested` on `clip.track_id`, rippling as needed.
    pub fn insert_clip(&mut self, mut clip: Clip, requested: TimeUs) -> Result<Placement> {
        let track = self.compatible_track(clip.track_id, clip.kind)?;
        let placement = plan_insertion(self, track.id, requested, clip.duration, None);
        clip.track_kind = track.kind;
        clip.start = placement.time;
        self.apply_ripple(&placement);
        info!(clip = %clip.id, start = %clip.start, track = %clip.track_id, "clip inserted");
        let end = clip.end();
        self.clips.push(clip);
        self.grow_extent_if_needed(end);
        Ok(placement)
    }

    /// Move an existing clip to `track_id` at `requested`, rippling as needed.
    pub fn move_clip(&mut self, clip_id: Uuid, track_id: Uuid, requested: TimeUs) -> Result<Placement> {
        let (kind, duration) = {
            let clip = self.clip(clip_id).ok_or(CoreError::ClipNotFound(clip_id))?;
            (clip.kind, clip.duration)
        };
        let track_kind = self.compatible_track(track_id, kind)?.kind;
        let placement = plan_insertion(self, track_id, requested, duration, Some(clip_id));
        self.apply_ripple(&placement);

        let clip = self.clip_mut(clip_id).ok_or(CoreError::ClipNotFound(clip_id))?;
        clip.start = placement.time;
        clip.track_id = track_id;
        clip.track_kind = track_kind;
        let end = clip.end();
        info!(clip = %clip_id, start = %placement.time, track = %track_id, "clip moved");
        self.grow_extent_if_needed(end);
        Ok(placement)
    }

    /// Start time for a clip that was added without an explicit position:
    /// `at` if `[at, at + duration)` is free on the track, else right after its last clip.
    pub fn best_position(&self, track_id: Uuid, at: TimeUs, duration: TimeUs) -> TimeUs {
        let at = at.max(TimeUs::ZERO);
        let clips = self.clips_on_track(track_id);
        if clips.iter().all(|c| !c.overlaps_span(at, at + duration)) {
            return at;
        }
        clips.iter().map(|c| c.end()).max().unwrap_or(TimeUs::ZERO)
    }

    /// Repair overlaps left behind by a resize of `clip_id` whose span was `original`.
    ///
    /// A left edge that crossed into the previous clip is pulled back to that clip's
    /// end. A right edge that crossed into the next clip pushes every following clip
    /// forward by the overlap.
    pub fn resolve_resize_overlap(
        &mut self,
        clip_id: Uuid,
        original: (TimeUs, TimeUs),
        min_duration: TimeUs,
    ) -> Result<Option<Placement>> {
        let (orig_start, _) = original;
        let clip = self.clip(clip_id).ok_or(CoreError::ClipNotFound(clip_id))?.clone();
        let neighbours: Vec<&Clip> = self
            .clips_on_track(clip.track_id)
            .into_iter()
            .filter(|c| c.id != clip_id)
            .collect();

        let left_bound = neighbours
            .iter()
            .filter(|c| c.start < orig_start)
            .map(|c| c.end())
            .max();
        let followers: Vec<Uuid> = neighbours
            .iter()
            .filter(|c| c.start >= orig_start)
            .map(|c| c.id)
            .collect();
        let next_start = neighbours
            .iter()
            .filter(|c| c.start >= orig_start)
            .map(|c| c.start)
            .min();

        let clip = self.clip_mut(clip_id).ok_or(CoreError::ClipNotFound(clip_id))?;
        if let Some(bound) = left_bound {
            if clip.start < bound {
                debug!(clip = %clip_id, bound = %bound, "left edge clamped to previous clip");
                clip.trim_start_to(bound);
                if clip.duration < min_duration {
                    clip.duration = min_duration;
                }
            }
        }
        let end = clip.end();

        let placement = match next_start {
            Some(next) if end > next => {
                let placement = Placement {
                    time: clip.start,
                    should_ripple: true,
                    affected: followers,
                    shift: end - next,
                };
                self.apply_ripple(&placement);
                Some(placement)
            }
            _ => None,
        };
        self.grow_extent_if_needed(end);
        Ok(placement)
    }

    /// Push clips that now overlap the end of `clip_id` (after its duration changed in place).
    pub fn push_followers(&mut self, clip_id: Uuid) -> Result<Option<Placement>> {
        let clip = self.clip(clip_id).ok_or(CoreError::ClipNotFound(clip_id))?;
        let span = (clip.start, clip.end());
        self.resolve_resize_overlap(clip_id, span, TimeUs::ZERO)
    }

    /// Resolve the placeholder length of clips still waiting on `media_id`'s metadata.
    ///
    /// A zero `duration` means the probe failed: the placeholder stays. Either way
    /// the clips stop waiting. A clip never extends past the end of its media.
    /// Clips the user already split or trimmed are no longer waiting and keep their span.
    /// Returns the ids of the clips that were waiting.
    pub fn apply_media_duration(&mut self, media_id: &str, duration: TimeUs) -> Vec<Uuid> {
        let mut waiting: Vec<(TimeUs, Uuid)> = self
            .clips
            .iter()
            .filter(|c| c.probe_pending && c.media_id == media_id)
            .map(|c| (c.start, c.id))
            .collect();
        waiting.sort();
        let ids: Vec<Uuid> = waiting.into_iter().map(|(_, id)| id).collect();

        for id in &ids {
            if let Some(clip) = self.clip_mut(*id) {
                clip.probe_pending = false;
                if duration > clip.source_in {
                    clip.duration = duration - clip.source_in;
                }
            }
            if duration.is_positive() {
                // Followers were already placed against the placeholder length.
                if let Err(e) = self.push_followers(*id) {
                    warn!(clip = %id, error = %e, "followers not pushed after media duration");
                }
            }
        }
        if !ids.is_empty() {
            info!(media = media_id, clips = ids.len(), duration = %duration, "media duration applied");
        }
        ids
    }

    fn compatible_track(&self, track_id: Uuid, media: MediaKind) -> Result<&Track> {
        let track = self.track(track_id).ok_or(CoreError::TrackNotFound(track_id))?;
        if !track.kind.accepts(media) {
            return Err(CoreError::IncompatibleTrack {
                media,
                track: track.kind,
            });
        }
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn secs(s: f64) -> TimeUs {
        TimeUs::from_seconds(s)
    }

    fn asset(kind: MediaKind, name: &str) -> AssetDescriptor {
        AssetDescriptor {
            id: name.to_string(),
            name: name.to_string(),
            kind,
            url: format!("blob:{name}"),
            duration: None,
            width: None,
            height: None,
        }
    }

    fn main_timeline() -> (Timeline, Uuid) {
        let tl = Timeline::new(&EngineConfig::default());
        let track_id = tl.main_tracks[0].id;
        (tl, track_id)
    }

    fn place(tl: &mut Timeline, track_id: Uuid, name: &str, start: f64, dur: f64) -> Uuid {
        let track = tl.track(track_id).unwrap().clone();
        let clip = Clip::from_asset(&asset(MediaKind::Video, name), &track, secs(start), secs(dur));
        let id = clip.id;
        tl.clips.push(clip);
        id
    }

    fn start_of(tl: &Timeline, id: Uuid) -> TimeUs {
        tl.clip(id).unwrap().start
    }

    // -----------------------------------------------------------------------
    // plan_insertion
    // -----------------------------------------------------------------------

    #[test]
    fn empty_track_inserts_at_requested_time() {
        let (tl, track) = main_timeline();
        let p = plan_insertion(&tl, track, secs(7.0), secs(3.0), None);
        assert_eq!(p, Placement::at(secs(7.0)));
    }

    #[test]
    fn negative_request_clamps_to_zero() {
        let (tl, track) = main_timeline();
        let p = plan_insertion(&tl, track, secs(-4.0), secs(3.0), None);
        assert_eq!(p.time, TimeUs::ZERO);
    }

    #[test]
    fn inside_clip_snaps_to_its_start_and_ripples_it() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 10.0);

        let p = plan_insertion(&tl, track, secs(2.0), secs(3.0), None);
        assert_eq!(p.time, TimeUs::ZERO);
        assert!(p.should_ripple);
        assert_eq!(p.affected, vec![a]);
        assert_eq!(p.shift, secs(3.0));
    }

    #[test]
    fn inside_clip_ripples_everything_after_but_nothing_before() {
        let (mut tl, track) = main_timeline();
        let before = place(&mut tl, track, "before", 0.0, 2.0);
        let host = place(&mut tl, track, "host", 4.0, 4.0);
        let after = place(&mut tl, track, "after", 20.0, 1.0);

        let p = plan_insertion(&tl, track, secs(5.0), secs(2.5), None);
        assert_eq!(p.time, secs(4.0));
        assert_eq!(p.affected, vec![host, after]);
        assert!(!p.affected.contains(&before));
    }

    #[test]
    fn gap_large_enough_inserts_without_ripple() {
        let (mut tl, track) = main_timeline();
        place(&mut tl, track, "a", 0.0, 2.0);
        place(&mut tl, track, "b", 10.0, 2.0);

        let p = plan_insertion(&tl, track, secs(4.0), secs(6.0), None);
        assert_eq!(p, Placement::at(secs(4.0)));
    }

    #[test]
    fn gap_too_small_inserts_and_ripples_from_next_clip() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 2.0);
        let b = place(&mut tl, track, "b", 5.0, 2.0);
        let c = place(&mut tl, track, "c", 9.0, 2.0);

        let p = plan_insertion(&tl, track, secs(3.0), secs(4.0), None);
        assert_eq!(p.time, secs(3.0));
        assert!(p.should_ripple);
        assert_eq!(p.affected, vec![b, c]);
        assert!(!p.affected.contains(&a));
        assert_eq!(p.shift, secs(4.0));
    }

    #[test]
    fn request_at_clip_start_ripples_that_clip() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 3.0, 2.0);
        let p = plan_insertion(&tl, track, secs(3.0), secs(1.0), None);
        assert_eq!(p.time, secs(3.0));
        assert_eq!(p.affected, vec![a]);
    }

    #[test]
    fn after_last_clip_inserts_without_ripple() {
        let (mut tl, track) = main_timeline();
        place(&mut tl, track, "a", 0.0, 10.0);
        let p = plan_insertion(&tl, track, secs(10.0), secs(5.0), None);
        assert_eq!(p, Placement::at(secs(10.0)));
    }

    #[test]
    fn excluded_clip_is_ignored() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 10.0);
        let p = plan_insertion(&tl, track, secs(2.0), secs(10.0), Some(a));
        assert_eq!(p, Placement::at(secs(2.0)));
    }

    // -----------------------------------------------------------------------
    // insert_clip / move_clip
    // -----------------------------------------------------------------------

    #[test]
    fn ripple_insert_scenario() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 10.0);
        let main = tl.track(track).unwrap().clone();
        let b = Clip::from_asset(&asset(MediaKind::Video, "b"), &main, TimeUs::ZERO, secs(3.0));
        let b_id = b.id;

        let p = tl.insert_clip(b, secs(2.0)).unwrap();
        assert_eq!(p.affected, vec![a]);
        assert_eq!(start_of(&tl, b_id), TimeUs::ZERO);
        assert_eq!(start_of(&tl, a), secs(3.0));
        assert_eq!(tl.clip(a).unwrap().end(), secs(13.0));
        assert!(tl.check_no_overlap().is_ok());
    }

    #[test]
    fn insert_rejects_incompatible_or_missing_track() {
        let (mut tl, _) = main_timeline();
        let audio_track = tl.audio_tracks[0].clone();
        let clip = Clip::from_asset(&asset(MediaKind::Video, "v"), &audio_track, TimeUs::ZERO, secs(1.0));
        assert!(matches!(
            tl.insert_clip(clip, TimeUs::ZERO),
            Err(CoreError::IncompatibleTrack { .. })
        ));

        let ghost = Track::new(TrackKind::Main, "ghost");
        let clip = Clip::from_asset(&asset(MediaKind::Video, "v"), &ghost, TimeUs::ZERO, secs(1.0));
        assert!(matches!(
            tl.insert_clip(clip, TimeUs::ZERO),
            Err(CoreError::TrackNotFound(_))
        ));
        assert!(tl.clips.is_empty());
    }

    #[test]
    fn insert_grows_extent() {
        let (mut tl, track) = main_timeline();
        let main = tl.track(track).unwrap().clone();
        let clip = Clip::from_asset(&asset(MediaKind::Video, "long"), &main, TimeUs::ZERO, secs(90.0));
        tl.insert_clip(clip, secs(5.0)).unwrap();
        assert_eq!(tl.duration, secs(105.0));
    }

    #[test]
    fn ripple_past_extent_grows_it() {
        let (mut tl, track) = main_timeline();
        place(&mut tl, track, "a", 50.0, 8.0);
        let main = tl.track(track).unwrap().clone();
        let clip = Clip::from_asset(&asset(MediaKind::Video, "b"), &main, TimeUs::ZERO, secs(5.0));
        tl.insert_clip(clip, secs(52.0)).unwrap();
        assert_eq!(tl.furthest_end(), secs(63.0));
        assert_eq!(tl.duration, secs(73.0));
    }

    #[test]
    fn move_clip_across_tracks() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 4.0);
        let overlay = tl.overlay_tracks[0].id;

        tl.move_clip(a, overlay, secs(6.0)).unwrap();
        let clip = tl.clip(a).unwrap();
        assert_eq!(clip.track_id, overlay);
        assert_eq!(clip.track_kind, TrackKind::Overlay);
        assert_eq!(clip.start, secs(6.0));
    }

    #[test]
    fn move_clip_into_neighbour_ripples_it() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 4.0);
        let b = place(&mut tl, track, "b", 10.0, 4.0);

        let p = tl.move_clip(a, track, secs(11.0)).unwrap();
        assert_eq!(p.affected, vec![b]);
        assert_eq!(start_of(&tl, a), secs(10.0));
        assert_eq!(start_of(&tl, b), secs(14.0));
        assert!(tl.check_no_overlap().is_ok());
    }

    #[test]
    fn move_clip_to_audio_track_is_rejected() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 4.0);
        let audio = tl.audio_tracks[0].id;
        assert!(tl.move_clip(a, audio, secs(1.0)).is_err());
        assert_eq!(tl.clip(a).unwrap().track_id, track);
    }

    #[test]
    fn repeated_inserts_never_overlap() {
        let (mut tl, track) = main_timeline();
        let main = tl.track(track).unwrap().clone();
        let requests = [(0.0, 5.0), (2.0, 3.0), (1.0, 4.0), (30.0, 2.0), (29.0, 6.0), (8.5, 0.5)];
        for (i, (at, dur)) in requests.iter().enumerate() {
            let clip = Clip::from_asset(
                &asset(MediaKind::Video, &format!("c{i}")),
                &main,
                TimeUs::ZERO,
                secs(*dur),
            );
            tl.insert_clip(clip, secs(*at)).unwrap();
            assert!(tl.check_no_overlap().is_ok(), "after insert {i}");
        }
    }

    // -----------------------------------------------------------------------
    // best_position
    // -----------------------------------------------------------------------

    #[test]
    fn best_position_prefers_requested_slot_then_appends() {
        let (mut tl, track) = main_timeline();
        assert_eq!(tl.best_position(track, TimeUs::ZERO, secs(10.0)), TimeUs::ZERO);

        place(&mut tl, track, "a", 0.0, 10.0);
        assert_eq!(tl.best_position(track, TimeUs::ZERO, secs(5.0)), secs(10.0));
        assert_eq!(tl.best_position(track, secs(20.0), secs(5.0)), secs(20.0));
    }

    // -----------------------------------------------------------------------
    // resolve_resize_overlap
    // -----------------------------------------------------------------------

    #[test]
    fn right_edge_overlap_pushes_followers() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 4.0);
        let b = place(&mut tl, track, "b", 5.0, 2.0);
        let c = place(&mut tl, track, "c", 8.0, 2.0);

        tl.clip_mut(a).unwrap().duration = secs(6.0);
        let p = tl
            .resolve_resize_overlap(a, (TimeUs::ZERO, secs(4.0)), secs(0.1))
            .unwrap()
            .unwrap();
        assert_eq!(p.shift, secs(1.0));
        assert_eq!(start_of(&tl, b), secs(6.0));
        assert_eq!(start_of(&tl, c), secs(9.0));
        assert!(tl.check_no_overlap().is_ok());
    }

    #[test]
    fn left_edge_overlap_is_clamped_to_previous_clip() {
        let (mut tl, track) = main_timeline();
        place(&mut tl, track, "a", 0.0, 4.0);
        let b = place(&mut tl, track, "b", 6.0, 4.0);

        tl.clip_mut(b).unwrap().trim_start_to(secs(1.0));
        let p = tl
            .resolve_resize_overlap(b, (secs(6.0), secs(10.0)), secs(0.1))
            .unwrap();
        assert!(p.is_none());
        let clip = tl.clip(b).unwrap();
        assert_eq!(clip.start, secs(4.0));
        assert_eq!(clip.end(), secs(10.0));
        assert!(tl.check_no_overlap().is_ok());
    }

    #[test]
    fn failed_probe_keeps_placeholder() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 5.0);
        tl.clip_mut(a).unwrap().probe_pending = true;

        assert_eq!(tl.apply_media_duration("a", TimeUs::ZERO), vec![a]);
        let clip = tl.clip(a).unwrap();
        assert_eq!(clip.duration, secs(5.0));
        assert!(!clip.probe_pending);
    }

    #[test]
    fn media_duration_is_measured_from_source_in() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 5.0);
        let b = place(&mut tl, track, "b", 5.0, 2.0);
        {
            let clip = tl.clip_mut(a).unwrap();
            clip.probe_pending = true;
            clip.source_in = secs(3.0);
        }

        assert_eq!(tl.apply_media_duration("a", secs(8.0)), vec![a]);
        assert_eq!(tl.clip(a).unwrap().duration, secs(5.0));
        assert_eq!(start_of(&tl, b), secs(5.0));
        assert!(tl.check_no_overlap().is_ok());
    }

    #[test]
    fn resize_without_overlap_changes_nothing() {
        let (mut tl, track) = main_timeline();
        let a = place(&mut tl, track, "a", 0.0, 4.0);
        let b = place(&mut tl, track, "b", 6.0, 4.0);
        tl.clip_mut(a).unwrap().duration = secs(5.0);
        assert!(tl
            .resolve_resize_overlap(a, (TimeUs::ZERO, secs(4.0)), secs(0.1))
            .unwrap()
            .is_none());
        assert_eq!(start_of(&tl, b), secs(6.0));
    }
}
