//! Timeline editing session: drag, drop, resize, split, clipboard and viewport.
//!
//! The [`Editor`] owns the committed [`Timeline`] plus all ephemeral interaction
//! state. Committed changes go through the placement methods on `Timeline`, so
//! every reported ripple is applied before a drop returns.

use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::geometry::{Geometry, Viewport};
use crate::overlay::OverlayTransformStore;
use crate::placement::plan_insertion;
use crate::snapshot::RenderRequest;
use crate::timeline::ClipField;
use crate::timer::{Scheduler, TimerId};
use crate::types::*;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pointer position: `x` from the left edge of the scrollable viewport,
/// `y` from the top of the track area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPos {
    pub x: f64,
    pub y: f64,
}

impl PointerPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Idle,
    DraggingFromLibrary(AssetDescriptor),
    /// `grab_offset` is the distance from the clip's start to the grab point.
    DraggingClip { clip_id: Uuid, grab_offset: TimeUs },
    Resizing {
        clip_id: Uuid,
        edge: Edge,
        /// `(start, end)` when the resize began.
        original: (TimeUs, TimeUs),
        original_source_in: TimeUs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
}

/// Auto-scroll runs alongside a drag or resize while the pointer is near an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScroll {
    pub direction: ScrollDirection,
    /// Pixels per timer tick.
    pub speed: f64,
    pub timer: TimerId,
}

/// Where the dragged item would land if released now.
#[derive(Debug, Clone, PartialEq)]
pub struct DropPreview {
    pub time: TimeUs,
    pub duration: TimeUs,
    pub track_id: Uuid,
    pub track_kind: TrackKind,
    pub is_valid: bool,
    pub should_ripple: bool,
    pub affected: Vec<Uuid>,
    /// Pointer-derived time before snapping.
    pub requested: TimeUs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelInput {
    pub delta_x: f64,
    pub delta_y: f64,
    pub ctrl: bool,
    pub shift: bool,
    pub pointer_x: f64,
}

pub struct Editor<S: Scheduler> {
    config: EngineConfig,
    geometry: Geometry,
    viewport: Viewport,
    timeline: Timeline,
    overlays: OverlayTransformStore,
    state: Interaction,
    auto_scroll: Option<AutoScroll>,
    preview: Option<DropPreview>,
    last_pointer: Option<PointerPos>,
    selected: Option<Uuid>,
    selected_overlay: Option<Uuid>,
    clipboard: Option<Clip>,
    armed: Option<AssetDescriptor>,
    help_open: bool,
    scheduler: S,
}

impl<S: Scheduler> Editor<S> {
    pub fn new(config: EngineConfig, scheduler: S, viewport_width: f64) -> Self {
        let timeline = Timeline::new(&config);
        Self::with_timeline(config, scheduler, viewport_width, timeline)
    }

    pub fn with_timeline(config: EngineConfig, scheduler: S, viewport_width: f64, timeline: Timeline) -> Self {
        Self {
            geometry: Geometry::new(&config),
            viewport: Viewport::new(viewport_width),
            overlays: OverlayTransformStore::new(&config),
            timeline,
            state: Interaction::Idle,
            auto_scroll: None,
            preview: None,
            last_pointer: None,
            selected: None,
            selected_overlay: None,
            clipboard: None,
            armed: None,
            help_open: false,
            scheduler,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn overlays(&self) -> &OverlayTransformStore {
        &self.overlays
    }

    /// Preview-canvas gestures mutate transforms directly.
    pub fn overlays_mut(&mut self) -> &mut OverlayTransformStore {
        &mut self.overlays
    }

    pub fn state(&self) -> &Interaction {
        &self.state
    }

    pub fn drop_preview(&self) -> Option<&DropPreview> {
        self.preview.as_ref()
    }

    pub fn auto_scroll(&self) -> Option<&AutoScroll> {
        self.auto_scroll.as_ref()
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_overlay(&self) -> Option<Uuid> {
        self.selected_overlay
    }

    pub fn clipboard(&self) -> Option<&Clip> {
        self.clipboard.as_ref()
    }

    pub fn armed_asset(&self) -> Option<&AssetDescriptor> {
        self.armed.as_ref()
    }

    pub fn is_help_open(&self) -> bool {
        self.help_open
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Simple edits
    // -----------------------------------------------------------------------

    pub fn add_track(&mut self, kind: TrackKind) -> Uuid {
        self.timeline.add_track(kind)
    }

    pub fn set_volume(&mut self, clip_id: Uuid, volume: f64) -> Result<()> {
        self.timeline.set_field(clip_id, ClipField::Volume, volume)
    }

    pub fn set_opacity(&mut self, clip_id: Uuid, opacity: f64) -> Result<()> {
        self.timeline.set_field(clip_id, ClipField::Opacity, opacity)
    }

    pub fn select(&mut self, clip_id: Option<Uuid>) {
        self.selected = clip_id.filter(|id| self.timeline.contains_clip(*id));
    }

    pub fn select_overlay(&mut self, clip_id: Option<Uuid>) {
        self.selected_overlay = clip_id.filter(|id| self.timeline.contains_clip(*id));
    }

    pub fn open_help(&mut self) {
        self.help_open = true;
    }

    /// Close help if open, otherwise drop the overlay selection.
    pub fn escape(&mut self) {
        if self.help_open {
            self.help_open = false;
        } else {
            self.selected_overlay = None;
        }
    }

    /// Remove a clip along with its selection and overlay transform.
    pub fn remove_clip(&mut self, clip_id: Uuid) -> Result<Clip> {
        let clip = self.timeline.remove_clip(clip_id)?;
        if self.selected == Some(clip_id) {
            self.selected = None;
        }
        if self.selected_overlay == Some(clip_id) {
            self.selected_overlay = None;
        }
        self.overlays.remove(clip_id);
        let busy = match &self.state {
            Interaction::DraggingClip { clip_id: id, .. } | Interaction::Resizing { clip_id: id, .. } => {
                *id == clip_id
            }
            _ => false,
        };
        if busy {
            self.finish_interaction();
        }
        Ok(clip)
    }

    pub fn delete_selected(&mut self) -> Result<Clip> {
        let id = self.selected.ok_or(CoreError::NothingSelected)?;
        self.remove_clip(id)
    }

    /// Apply a resolved metadata probe to clips still waiting on it.
    pub fn apply_media_duration(&mut self, media_id: &str, duration: TimeUs) -> Vec<Uuid> {
        self.timeline.apply_media_duration(media_id, duration)
    }

    pub fn render_request(&self) -> RenderRequest {
        RenderRequest::from_parts(&self.timeline, &self.overlays)
    }

    // -----------------------------------------------------------------------
    // Adding assets
    // -----------------------------------------------------------------------

    /// Length a new clip of `asset` gets, and whether it is a placeholder.
    fn asset_duration(&self, asset: &AssetDescriptor) -> (TimeUs, bool) {
        match (asset.intrinsic_duration(), asset.kind) {
            (Some(d), _) => (d, false),
            (None, MediaKind::Image) => (self.config.default_image_duration, false),
            (None, _) => (self.config.fallback_duration, true),
        }
    }

    fn clip_for(&self, asset: &AssetDescriptor, track: &Track) -> Clip {
        let (duration, pending) = self.asset_duration(asset);
        let mut clip = Clip::from_asset(asset, track, TimeUs::ZERO, duration);
        clip.probe_pending = pending;
        clip
    }

    /// Add an asset without an explicit position: at `playhead` on its default
    /// track if that slot is free, else after the track's last clip.
    pub fn add_asset(&mut self, asset: &AssetDescriptor, playhead: TimeUs) -> Option<Uuid> {
        let Some(track) = self.timeline.default_track_for(asset.kind).cloned() else {
            warn!(asset = %asset.id, kind = ?asset.kind, "no track for asset; ignored");
            return None;
        };
        let clip = self.clip_for(asset, &track);
        let start = self.timeline.best_position(track.id, playhead, clip.duration);
        self.commit_new_clip(clip, start)
    }

    fn commit_new_clip(&mut self, clip: Clip, requested: TimeUs) -> Option<Uuid> {
        let id = clip.id;
        match self.timeline.insert_clip(clip, requested) {
            Ok(_) => Some(id),
            Err(e) => {
                warn!(error = %e, "clip insert rejected");
                None
            }
        }
    }

    /// Arm an asset for double-click insertion.
    pub fn arm_asset(&mut self, asset: Option<AssetDescriptor>) {
        self.armed = asset;
    }

    /// Insert the armed asset at the clicked time and track.
    pub fn double_click(&mut self, pointer: PointerPos) -> Option<Uuid> {
        let asset = self.armed.clone()?;
        let track = self.track_under(pointer)?.clone();
        if !track.kind.accepts(asset.kind) {
            debug!(track = %track.id, "armed asset does not fit track");
            return None;
        }
        let clip = self.clip_for(&asset, &track);
        let at = self.viewport.time_at(&self.geometry, pointer.x);
        let id = self.commit_new_clip(clip, at)?;
        self.armed = None;
        Some(id)
    }

    fn track_under(&self, pointer: PointerPos) -> Option<&Track> {
        let row = self.geometry.row_at(pointer.y)?;
        self.timeline.track_at_row(row)
    }

    // -----------------------------------------------------------------------
    // Dragging
    // -----------------------------------------------------------------------

    pub fn begin_library_drag(&mut self, asset: AssetDescriptor) -> bool {
        if matches!(self.state, Interaction::Resizing { .. }) {
            return false;
        }
        debug!(asset = %asset.id, "library drag started");
        self.finish_interaction();
        self.state = Interaction::DraggingFromLibrary(asset);
        true
    }

    /// Start moving an existing clip. Ignored while a resize is in progress.
    pub fn begin_clip_drag(&mut self, clip_id: Uuid, pointer: PointerPos) -> bool {
        if matches!(self.state, Interaction::Resizing { .. }) {
            return false;
        }
        let Some(clip) = self.timeline.clip(clip_id) else {
            return false;
        };
        let grab_offset = self.viewport.time_at(&self.geometry, pointer.x) - clip.start;
        self.finish_interaction();
        self.selected = Some(clip_id);
        self.state = Interaction::DraggingClip { clip_id, grab_offset };
        true
    }

    /// Track the pointer during a drag or resize.
    pub fn pointer_move(&mut self, pointer: PointerPos) -> Option<&DropPreview> {
        if matches!(self.state, Interaction::Idle) {
            return None;
        }
        self.last_pointer = Some(pointer);
        self.update_auto_scroll(pointer.x);
        self.track_pointer(pointer);
        self.preview.as_ref()
    }

    fn track_pointer(&mut self, pointer: PointerPos) {
        match self.state {
            Interaction::Resizing { .. } => self.resize_to(pointer),
            Interaction::Idle => {}
            _ => self.preview = self.compute_preview(pointer),
        }
    }

    fn compute_preview(&self, pointer: PointerPos) -> Option<DropPreview> {
        let track = self.track_under(pointer)?;
        let pointer_time = self.viewport.time_at(&self.geometry, pointer.x);
        let (kind, duration, requested, exclude) = match &self.state {
            Interaction::DraggingFromLibrary(asset) => {
                (asset.kind, self.asset_duration(asset).0, pointer_time, None)
            }
            Interaction::DraggingClip { clip_id, grab_offset } => {
                let clip = self.timeline.clip(*clip_id)?;
                (clip.kind, clip.duration, pointer_time - *grab_offset, Some(*clip_id))
            }
            _ => return None,
        };
        let requested = requested.max(TimeUs::ZERO);
        let is_valid = track.kind.accepts(kind);
        let (time, should_ripple, affected) = if is_valid {
            let p = plan_insertion(&self.timeline, track.id, requested, duration, exclude);
            (p.time, p.should_ripple, p.affected)
        } else {
            (requested, false, vec![])
        };
        Some(DropPreview {
            time,
            duration,
            track_id: track.id,
            track_kind: track.kind,
            is_valid,
            should_ripple,
            affected,
            requested,
        })
    }

    /// Release the drag. Returns the id of the placed clip.
    pub fn drop_at(&mut self, playhead: TimeUs) -> Option<Uuid> {
        let state = std::mem::replace(&mut self.state, Interaction::Idle);
        let preview = self.preview.take().filter(|p| p.is_valid);
        self.stop_auto_scroll();
        self.last_pointer = None;

        match state {
            Interaction::DraggingFromLibrary(asset) => match preview {
                Some(p) => {
                    let track = self.timeline.track(p.track_id)?.clone();
                    let clip = self.clip_for(&asset, &track);
                    self.commit_new_clip(clip, p.requested)
                }
                None => self.add_asset(&asset, playhead),
            },
            Interaction::DraggingClip { clip_id, .. } => {
                let p = preview?;
                match self.timeline.move_clip(clip_id, p.track_id, p.requested) {
                    Ok(_) => Some(clip_id),
                    Err(e) => {
                        warn!(error = %e, clip = %clip_id, "clip move rejected");
                        None
                    }
                }
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn cancel_drag(&mut self) {
        if matches!(
            self.state,
            Interaction::DraggingFromLibrary(_) | Interaction::DraggingClip { .. }
        ) {
            self.finish_interaction();
        }
    }

    fn finish_interaction(&mut self) {
        self.state = Interaction::Idle;
        self.preview = None;
        self.last_pointer = None;
        self.stop_auto_scroll();
    }

    // -----------------------------------------------------------------------
    // Resizing
    // -----------------------------------------------------------------------

    /// Start dragging one edge of a clip. Cancels any drag in progress.
    pub fn begin_resize(&mut self, clip_id: Uuid, edge: Edge) -> bool {
        let Some(clip) = self.timeline.clip(clip_id) else {
            return false;
        };
        let state = Interaction::Resizing {
            clip_id,
            edge,
            original: (clip.start, clip.end()),
            original_source_in: clip.source_in,
        };
        self.finish_interaction();
        self.selected = Some(clip_id);
        self.state = state;
        true
    }

    fn resize_to(&mut self, pointer: PointerPos) {
        let Interaction::Resizing {
            clip_id,
            edge,
            original: (left, right),
            original_source_in,
        } = self.state
        else {
            return;
        };
        let min = self.config.min_clip_duration;
        let t = self.viewport.time_at(&self.geometry, pointer.x);
        let Some(clip) = self.timeline.clip_mut(clip_id) else {
            return;
        };
        clip.probe_pending = false;
        match edge {
            Edge::Left => {
                let new_start = t.min(right - min).max(TimeUs::ZERO);
                clip.start = new_start;
                clip.duration = right - new_start;
                clip.source_in = (original_source_in + (new_start - left)).max(TimeUs::ZERO);
            }
            Edge::Right => {
                let new_end = t.max(left + min);
                clip.duration = new_end - left;
            }
        }
    }

    /// Finish a resize and repair any overlap it left with its neighbours.
    pub fn end_resize(&mut self) {
        let Interaction::Resizing { clip_id, original, .. } = self.state else {
            return;
        };
        self.finish_interaction();
        match self
            .timeline
            .resolve_resize_overlap(clip_id, original, self.config.min_clip_duration)
        {
            Ok(Some(p)) => info!(clip = %clip_id, shift = %p.shift, "resize pushed neighbours"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "resize resolution skipped"),
        }
    }

    // -----------------------------------------------------------------------
    // Auto-scroll
    // -----------------------------------------------------------------------

    fn update_auto_scroll(&mut self, x: f64) {
        self.stop_auto_scroll();
        let margin = self.config.auto_scroll_margin;
        let width = self.viewport.width;
        let (direction, depth) = if x < margin {
            (ScrollDirection::Left, margin - x)
        } else if x > width - margin {
            (ScrollDirection::Right, x - (width - margin))
        } else {
            return;
        };
        let speed = self.config.auto_scroll_max_speed * (depth / margin).clamp(0.0, 1.0);
        if speed <= 0.0 {
            return;
        }
        let timer = self
            .scheduler
            .start_interval(Duration::from_millis(self.config.auto_scroll_interval_ms));
        self.auto_scroll = Some(AutoScroll {
            direction,
            speed,
            timer,
        });
    }

    fn stop_auto_scroll(&mut self) {
        if let Some(scroll) = self.auto_scroll.take() {
            self.scheduler.cancel(scroll.timer);
        }
    }

    pub fn owns_timer(&self, id: TimerId) -> bool {
        self.auto_scroll.map(|s| s.timer) == Some(id)
    }

    /// Handle an auto-scroll tick. Returns false for timers this editor doesn't own.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        let Some(scroll) = self.auto_scroll.filter(|s| s.timer == id) else {
            return false;
        };
        let dx = match scroll.direction {
            ScrollDirection::Left => -scroll.speed,
            ScrollDirection::Right => scroll.speed,
        };
        let max = self.viewport.max_scroll(&self.geometry, self.timeline.duration);
        self.viewport.scroll_by(dx, max);
        if let Some(pointer) = self.last_pointer {
            self.track_pointer(pointer);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Viewport
    // -----------------------------------------------------------------------

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport.width = width;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.zoom = self.config.clamp_zoom(zoom);
    }

    /// Ctrl+wheel zooms around the pointer, Shift+wheel scrolls horizontally.
    pub fn wheel(&mut self, input: WheelInput) -> bool {
        if input.ctrl {
            let factor = if input.delta_y < 0.0 {
                self.config.zoom_step
            } else if input.delta_y > 0.0 {
                1.0 / self.config.zoom_step
            } else {
                return false;
            };
            let zoom = self.viewport.zoom * factor;
            self.viewport
                .zoom_at(&self.geometry, &self.config, input.pointer_x, zoom);
            true
        } else if input.shift {
            let dx = if input.delta_x != 0.0 { input.delta_x } else { input.delta_y };
            let max = self.viewport.max_scroll(&self.geometry, self.timeline.duration);
            self.viewport.scroll_by(dx, max);
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Split / clipboard
    // -----------------------------------------------------------------------

    /// Cut the selected clip at `playhead`. Returns the id of the new right half.
    pub fn split(&mut self, playhead: TimeUs) -> Result<Uuid> {
        let id = self.selected.ok_or(CoreError::NothingSelected)?;
        let clip = self.timeline.clip_mut(id).ok_or(CoreError::ClipNotFound(id))?;
        if !clip.strictly_contains(playhead) {
            return Err(CoreError::InvalidOperation(
                "split position must be strictly between clip start and end".into(),
            ));
        }
        let mut right = clip.clone();
        right.id = Uuid::new_v4();
        right.start = playhead;
        right.duration = clip.end() - playhead;
        right.source_in = clip.source_time_at(playhead);
        clip.duration = playhead - clip.start;
        // Both halves now have user-chosen spans; a late probe must not stretch them.
        clip.probe_pending = false;
        right.probe_pending = false;

        let right_id = right.id;
        info!(left = %id, right = %right_id, at = %playhead, "clip split");
        self.timeline.clips.push(right);
        self.overlays.copy(id, right_id);
        Ok(right_id)
    }

    pub fn copy(&mut self) -> Result<()> {
        let id = self.selected.ok_or(CoreError::NothingSelected)?;
        let clip = self.timeline.clip(id).ok_or(CoreError::ClipNotFound(id))?;
        debug!(clip = %id, "clip copied");
        self.clipboard = Some(clip.clone());
        Ok(())
    }

    /// Insert the clipboard clip at `playhead` on its original track.
    pub fn paste(&mut self, playhead: TimeUs) -> Result<Uuid> {
        let source = self.clipboard.clone().ok_or(CoreError::EmptyClipboard)?;
        let mut clip = source.clone();
        clip.id = Uuid::new_v4();
        let original_fits = self
            .timeline
            .track(source.track_id)
            .is_some_and(|t| t.kind.accepts(source.kind));
        if !original_fits {
            let fallback = self
                .timeline
                .default_track_for(source.kind)
                .ok_or(CoreError::NoTrackOfKind(source.kind.default_track_kind()))?;
            clip.track_id = fallback.id;
        }
        let id = clip.id;
        self.timeline.insert_clip(clip, playhead)?;
        self.overlays.copy(source.id, id);
        self.selected = Some(id);
        info!(source = %source.id, clip = %id, at = %playhead, "clip pasted");
        Ok(id)
    }
}
