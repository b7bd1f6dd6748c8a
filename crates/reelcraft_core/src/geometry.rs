//! Mapping between timeline time and timeline pixels.

use crate::config::EngineConfig;
use crate::types::TimeUs;

/// Fixed scale constants of the timeline canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub base_pixels_per_second: f64,
    pub track_height: f64,
}

impl Geometry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            base_pixels_per_second: config.base_pixels_per_second,
            track_height: config.track_height,
        }
    }

    pub fn pixels_per_second(&self, zoom: f64) -> f64 {
        self.base_pixels_per_second * zoom
    }

    pub fn time_to_pixel(&self, t: TimeUs, zoom: f64) -> f64 {
        t.as_seconds() * self.pixels_per_second(zoom)
    }

    pub fn pixel_to_time(&self, px: f64, zoom: f64) -> TimeUs {
        TimeUs::from_seconds(px / self.pixels_per_second(zoom))
    }

    pub fn duration_to_width(&self, d: TimeUs, zoom: f64) -> f64 {
        self.time_to_pixel(d, zoom)
    }

    pub fn row_top(&self, index: usize) -> f64 {
        index as f64 * self.track_height
    }

    /// Row under a y offset measured from the top of the track area.
    pub fn row_at(&self, y: f64) -> Option<usize> {
        if y < 0.0 || !y.is_finite() {
            return None;
        }
        Some((y / self.track_height).floor() as usize)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// Horizontal window onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    /// Pixels scrolled from the timeline origin.
    pub scroll_offset: f64,
    /// Visible width of the scrollable area.
    pub width: f64,
}

impl Viewport {
    pub fn new(width: f64) -> Self {
        Self {
            zoom: 1.0,
            scroll_offset: 0.0,
            width,
        }
    }

    /// Timeline time under a pointer x offset relative to the viewport's left edge.
    pub fn time_at(&self, geometry: &Geometry, pointer_x: f64) -> TimeUs {
        geometry.pixel_to_time(pointer_x + self.scroll_offset, self.zoom)
    }

    /// Zoom while keeping the time under `pointer_x` in place.
    pub fn zoom_at(&mut self, geometry: &Geometry, config: &EngineConfig, pointer_x: f64, zoom: f64) {
        let anchor = geometry.pixel_to_time(pointer_x + self.scroll_offset, self.zoom);
        self.zoom = config.clamp_zoom(zoom);
        self.scroll_offset = (geometry.time_to_pixel(anchor, self.zoom) - pointer_x).max(0.0);
    }

    pub fn scroll_by(&mut self, dx: f64, max_offset: f64) {
        self.scroll_offset = (self.scroll_offset + dx).clamp(0.0, max_offset.max(0.0));
    }

    /// Largest scroll offset that still shows content up to `duration`.
    pub fn max_scroll(&self, geometry: &Geometry, duration: TimeUs) -> f64 {
        (geometry.time_to_pixel(duration, self.zoom) - self.width).max(0.0)
    }
}
