//! Visual transforms of overlay clips on the preview canvas.
//!
//! Position is the offset of the overlay's centre from the preview's centre,
//! in preview pixels.

use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OverlayTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

/// Partial update merged by [`OverlayTransformStore::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Pointer movement away from the opposite corner grows the overlay.
    fn signs(&self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomLeft => (-1.0, 1.0),
            Corner::BottomRight => (1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureKind {
    Move,
    Scale(Corner),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gesture {
    clip_id: Uuid,
    kind: GestureKind,
    origin: (f64, f64),
    start: OverlayTransform,
}

/// Per-clip overlay transforms plus the in-flight pointer gesture, if any.
#[derive(Debug, Clone)]
pub struct OverlayTransformStore {
    transforms: BTreeMap<Uuid, OverlayTransform>,
    gesture: Option<Gesture>,
    scale_sensitivity: f64,
    min_scale: f64,
    max_scale: f64,
    wheel_scale_step: f64,
    padding: f64,
}

impl OverlayTransformStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            transforms: BTreeMap::new(),
            gesture: None,
            scale_sensitivity: config.scale_sensitivity,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            wheel_scale_step: config.wheel_scale_step,
            padding: config.preview_padding,
        }
    }

    pub fn get(&self, clip_id: Uuid) -> OverlayTransform {
        self.transforms.get(&clip_id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, clip_id: Uuid, patch: TransformPatch) -> OverlayTransform {
        let entry = self.transforms.entry(clip_id).or_default();
        if let Some(x) = patch.x {
            entry.x = x;
        }
        if let Some(y) = patch.y {
            entry.y = y;
        }
        if let Some(scale) = patch.scale {
            entry.scale = scale.clamp(self.min_scale, self.max_scale);
        }
        if let Some(opacity) = patch.opacity {
            entry.opacity = opacity.clamp(0.0, 1.0);
        }
        *entry
    }

    pub fn set_opacity(&mut self, clip_id: Uuid, opacity: f64) -> OverlayTransform {
        self.set(
            clip_id,
            TransformPatch {
                opacity: Some(opacity),
                ..Default::default()
            },
        )
    }

    pub fn contains(&self, clip_id: Uuid) -> bool {
        self.transforms.contains_key(&clip_id)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Drop the entry of a deleted clip.
    pub fn remove(&mut self, clip_id: Uuid) -> Option<OverlayTransform> {
        if self.gesture.map(|g| g.clip_id) == Some(clip_id) {
            self.gesture = None;
        }
        self.transforms.remove(&clip_id)
    }

    /// Give `to` the same transform as `from`, if `from` has one.
    pub fn copy(&mut self, from: Uuid, to: Uuid) {
        if let Some(t) = self.transforms.get(&from).copied() {
            self.transforms.insert(to, t);
        }
    }

    /// Drop every entry whose clip no longer exists.
    pub fn retain(&mut self, mut alive: impl FnMut(Uuid) -> bool) {
        self.transforms.retain(|id, _| alive(*id));
    }

    pub fn snapshot(&self) -> BTreeMap<Uuid, OverlayTransform> {
        self.transforms.clone()
    }

    // -----------------------------------------------------------------------
    // Pointer gestures
    // -----------------------------------------------------------------------

    pub fn begin_move(&mut self, clip_id: Uuid, pointer: (f64, f64)) {
        self.begin(clip_id, GestureKind::Move, pointer);
    }

    pub fn begin_scale(&mut self, clip_id: Uuid, corner: Corner, pointer: (f64, f64)) {
        self.begin(clip_id, GestureKind::Scale(corner), pointer);
    }

    fn begin(&mut self, clip_id: Uuid, kind: GestureKind, origin: (f64, f64)) {
        self.gesture = Some(Gesture {
            clip_id,
            kind,
            origin,
            start: self.get(clip_id),
        });
    }

    pub fn is_gesturing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Apply the active gesture for a pointer at `pointer`.
    ///
    /// `frame` is the preview size and `natural` the overlay's unscaled size.
    pub fn gesture_move(&mut self, pointer: (f64, f64), frame: Size, natural: Size) -> Option<OverlayTransform> {
        let gesture = self.gesture?;
        let dx = pointer.0 - gesture.origin.0;
        let dy = pointer.1 - gesture.origin.1;
        let mut next = gesture.start;
        match gesture.kind {
            GestureKind::Move => {
                next.x = gesture.start.x + dx;
                next.y = gesture.start.y + dy;
            }
            GestureKind::Scale(corner) => {
                let (sx, sy) = corner.signs();
                let delta = sx * dx + sy * dy;
                next.scale = (gesture.start.scale + delta * self.scale_sensitivity)
                    .clamp(self.min_scale, self.max_scale);
            }
        }
        let (x, y) = self.clamp_position(next.x, next.y, next.scale, frame, natural);
        next.x = x;
        next.y = y;
        self.transforms.insert(gesture.clip_id, next);
        Some(next)
    }

    pub fn end_gesture(&mut self) {
        self.gesture = None;
    }

    /// Modifier+wheel scale nudge. Negative `delta_y` (wheel up) grows the overlay.
    pub fn wheel_scale(&mut self, clip_id: Uuid, delta_y: f64) -> OverlayTransform {
        let current = self.get(clip_id);
        let step = if delta_y < 0.0 {
            self.wheel_scale_step
        } else if delta_y > 0.0 {
            -self.wheel_scale_step
        } else {
            0.0
        };
        self.set(
            clip_id,
            TransformPatch {
                scale: Some(current.scale + step),
                ..Default::default()
            },
        )
    }

    /// Keep the scaled overlay box inside the frame, `padding` pixels from each edge.
    fn clamp_position(&self, x: f64, y: f64, scale: f64, frame: Size, natural: Size) -> (f64, f64) {
        let limit = |frame_len: f64, len: f64| ((frame_len - len * scale) / 2.0 - self.padding).max(0.0);
        let lx = limit(frame.width, natural.width);
        let ly = limit(frame.height, natural.height);
        (x.clamp(-lx, lx), y.clamp(-ly, ly))
    }
}
