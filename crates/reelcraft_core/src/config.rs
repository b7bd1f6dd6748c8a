use crate::error::Result;
use crate::types::TimeUs;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable constants of the editing engine.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub base_pixels_per_second: f64,
    pub track_height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Multiplicative zoom change per wheel notch.
    pub zoom_step: f64,
    pub extent_margin: TimeUs,
    pub initial_duration: TimeUs,
    pub min_clip_duration: TimeUs,
    pub default_image_duration: TimeUs,
    /// Placeholder length for video/audio whose duration is not known yet.
    pub fallback_duration: TimeUs,
    pub auto_scroll_margin: f64,
    /// Pixels per auto-scroll tick at full penetration of the margin.
    pub auto_scroll_max_speed: f64,
    pub auto_scroll_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub drift_tolerance: TimeUs,
    pub scale_sensitivity: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub wheel_scale_step: f64,
    pub preview_padding: f64,
    pub probe_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_pixels_per_second: 50.0,
            track_height: 60.0,
            min_zoom: 0.1,
            max_zoom: 20.0,
            zoom_step: 1.1,
            extent_margin: TimeUs::from_seconds(10.0),
            initial_duration: TimeUs::from_seconds(60.0),
            min_clip_duration: TimeUs::from_seconds(0.1),
            default_image_duration: TimeUs::from_seconds(5.0),
            fallback_duration: TimeUs::from_seconds(5.0),
            auto_scroll_margin: 120.0,
            auto_scroll_max_speed: 24.0,
            auto_scroll_interval_ms: 16,
            tick_interval_ms: 100,
            drift_tolerance: TimeUs::from_seconds(0.2),
            scale_sensitivity: 0.005,
            min_scale: 0.2,
            max_scale: 4.0,
            wheel_scale_step: 0.05,
            preview_padding: 8.0,
            probe_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    pub fn tick_step(&self) -> TimeUs {
        TimeUs::from_millis(self.tick_interval_ms as i64)
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{"track_height": 80.0}"#).unwrap();
        assert_eq!(cfg.track_height, 80.0);
        assert_eq!(cfg.base_pixels_per_second, 50.0);
        assert_eq!(cfg.min_clip_duration, TimeUs(100_000));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"tick_interval_ms": 50, "drift_tolerance": 100000}"#).unwrap();

        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.tick_step(), TimeUs(50_000));
        assert_eq!(cfg.drift_tolerance, TimeUs(100_000));
    }

    #[test]
    fn load_nonexistent_file_returns_error() {
        assert!(EngineConfig::load("/tmp/does_not_exist_reelcraft_engine.json").is_err());
    }

    #[test]
    fn clamps() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.clamp_zoom(100.0), 20.0);
        assert_eq!(cfg.clamp_zoom(0.0), 0.1);
        assert_eq!(cfg.clamp_scale(10.0), 4.0);
        assert_eq!(cfg.clamp_scale(0.01), 0.2);
    }
}
