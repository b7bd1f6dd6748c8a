use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

/// A point or span on the timeline, in microseconds.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);

    /// Rounded to the nearest microsecond so that `0.3` seconds is exactly `300_000`.
    pub fn from_seconds(s: f64) -> Self {
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms * 1_000)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for TimeUs {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for TimeUs {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for TimeUs {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<i64> for TimeUs {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for TimeUs {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_us = self.0.unsigned_abs();
        let total_ms = total_us / 1_000;
        let ms = total_ms % 1_000;
        let total_secs = total_ms / 1_000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if self.0 < 0 {
            write!(f, "-{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        } else {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        }
    }
}

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// Kind of media behind a clip. The media library labels these `videos`,
/// `audios` and `images`; both spellings are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[serde(rename = "video", alias = "videos")]
    Video,
    #[serde(rename = "audio", alias = "audios")]
    Audio,
    #[serde(rename = "image", alias = "images")]
    Image,
}

impl MediaKind {
    /// Track kind an asset lands on when no explicit target is given.
    pub fn default_track_kind(&self) -> TrackKind {
        match self {
            MediaKind::Video => TrackKind::Main,
            MediaKind::Audio => TrackKind::Audio,
            MediaKind::Image => TrackKind::Overlay,
        }
    }

    pub fn is_visual(&self) -> bool {
        !matches!(self, MediaKind::Audio)
    }
}

// ---------------------------------------------------------------------------
// TrackKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Overlay,
    Main,
    Audio,
}

impl TrackKind {
    /// Video and images go on overlay or main tracks, audio only on audio tracks.
    pub fn accepts(&self, media: MediaKind) -> bool {
        match self {
            TrackKind::Overlay | TrackKind::Main => media.is_visual(),
            TrackKind::Audio => media == MediaKind::Audio,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackKind::Overlay => "Overlay",
            TrackKind::Main => "Main",
            TrackKind::Audio => "Audio",
        }
    }
}

// ---------------------------------------------------------------------------
// AssetDescriptor
// ---------------------------------------------------------------------------

/// Media asset as handed over by the media library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    /// Seconds. Absent until the library has probed the file.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl AssetDescriptor {
    /// Known positive duration, if any.
    pub fn intrinsic_duration(&self) -> Option<TimeUs> {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(TimeUs::from_seconds)
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: Uuid,
    pub kind: TrackKind,
    pub name: String,
}

impl Track {
    pub fn new(kind: TrackKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// A placed media reference on a track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: Uuid,
    pub media_id: String,
    pub kind: MediaKind,
    pub name: String,
    pub source_url: String,
    pub start: TimeUs,
    pub duration: TimeUs,
    /// Offset into the media where playback of this clip begins.
    #[serde(default)]
    pub source_in: TimeUs,
    pub track_id: Uuid,
    pub track_kind: TrackKind,
    pub volume: f64,
    pub opacity: f64,
    /// Duration is a placeholder until the metadata probe for `media_id` resolves
    /// or the user splits or trims the clip.
    #[serde(default)]
    pub probe_pending: bool,
}

impl Clip {
    pub fn from_asset(asset: &AssetDescriptor, track: &Track, start: TimeUs, duration: TimeUs) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_id: asset.id.clone(),
            kind: asset.kind,
            name: asset.name.clone(),
            source_url: asset.url.clone(),
            start,
            duration,
            source_in: TimeUs::ZERO,
            track_id: track.id,
            track_kind: track.kind,
            volume: 1.0,
            opacity: 1.0,
            probe_pending: false,
        }
    }

    pub fn end(&self) -> TimeUs {
        self.start + self.duration
    }

    /// `start <= t < end`.
    pub fn contains(&self, t: TimeUs) -> bool {
        self.start <= t && t < self.end()
    }

    /// `start < t < end`.
    pub fn strictly_contains(&self, t: TimeUs) -> bool {
        self.start < t && t < self.end()
    }

    /// Half-open span intersection on the same track.
    pub fn overlaps(&self, other: &Clip) -> bool {
        self.track_id == other.track_id && self.overlaps_span(other.start, other.end())
    }

    pub fn overlaps_span(&self, start: TimeUs, end: TimeUs) -> bool {
        self.start < end && start < self.end()
    }

    /// Position inside the media that corresponds to timeline time `t`.
    pub fn source_time_at(&self, t: TimeUs) -> TimeUs {
        self.source_in + (t - self.start)
    }

    /// Move the left edge, keeping the right edge fixed. The in-point follows.
    pub fn trim_start_to(&mut self, new_start: TimeUs) {
        let end = self.end();
        let delta = new_start - self.start;
        self.source_in = (self.source_in + delta).max(TimeUs::ZERO);
        self.start = new_start;
        self.duration = end - new_start;
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Committed tracks and clips.
///
/// Tracks are kept in three ordered groups; the flattened order
/// (overlays, main, audio) is the vertical stacking order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub overlay_tracks: Vec<Track>,
    pub main_tracks: Vec<Track>,
    pub audio_tracks: Vec<Track>,
    pub clips: Vec<Clip>,
    /// Right bound of the ruler (`videoDuration`).
    pub duration: TimeUs,
    /// Head-room added whenever a clip end pushes past `duration`.
    #[serde(default = "default_extent_margin")]
    pub extent_margin: TimeUs,
}

fn default_extent_margin() -> TimeUs {
    TimeUs::from_seconds(10.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(kind: MediaKind, duration: Option<f64>) -> AssetDescriptor {
        AssetDescriptor {
            id: "file-1".into(),
            name: "intro".into(),
            kind,
            url: "blob:intro".into(),
            duration,
            width: None,
            height: None,
        }
    }

    #[test]
    fn time_us_add_sub() {
        let a = TimeUs(5_000_000);
        let b = TimeUs(3_000_000);
        assert_eq!(a + b, TimeUs(8_000_000));
        assert_eq!(a - b, TimeUs(2_000_000));
        assert_eq!(-b, TimeUs(-3_000_000));
    }

    #[test]
    fn time_us_from_seconds_rounds() {
        assert_eq!(TimeUs::from_seconds(2.5), TimeUs(2_500_000));
        assert_eq!(TimeUs::from_seconds(0.3), TimeUs(300_000));
        assert_eq!(TimeUs::from_seconds(0.1) * 3, TimeUs(300_000));
        assert!((TimeUs(2_500_000).as_seconds() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn time_us_display() {
        assert_eq!(TimeUs(0).to_string(), "00:00:00.000");
        assert_eq!(TimeUs(1_500_000).to_string(), "00:00:01.500");
        assert_eq!(TimeUs::from_seconds(3661.5).to_string(), "01:01:01.500");
        assert_eq!(TimeUs::from_seconds(-2.0).to_string(), "-00:00:02.000");
    }

    #[test]
    fn media_kind_default_tracks() {
        assert_eq!(MediaKind::Video.default_track_kind(), TrackKind::Main);
        assert_eq!(MediaKind::Audio.default_track_kind(), TrackKind::Audio);
        assert_eq!(MediaKind::Image.default_track_kind(), TrackKind::Overlay);
    }

    #[test]
    fn track_kind_compatibility() {
        assert!(TrackKind::Main.accepts(MediaKind::Video));
        assert!(TrackKind::Main.accepts(MediaKind::Image));
        assert!(TrackKind::Overlay.accepts(MediaKind::Video));
        assert!(!TrackKind::Overlay.accepts(MediaKind::Audio));
        assert!(TrackKind::Audio.accepts(MediaKind::Audio));
        assert!(!TrackKind::Audio.accepts(MediaKind::Image));
    }

    #[test]
    fn asset_descriptor_accepts_library_type_names() {
        let json = r#"{"id":"a1","name":"song","type":"audios","url":"blob:x","duration":12.5}"#;
        let asset: AssetDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(asset.kind, MediaKind::Audio);
        assert_eq!(asset.intrinsic_duration(), Some(TimeUs(12_500_000)));
        assert_eq!(asset.width, None);
    }

    #[test]
    fn intrinsic_duration_ignores_zero_and_nan() {
        assert_eq!(asset(MediaKind::Video, Some(0.0)).intrinsic_duration(), None);
        assert_eq!(asset(MediaKind::Video, Some(f64::NAN)).intrinsic_duration(), None);
        assert_eq!(asset(MediaKind::Video, None).intrinsic_duration(), None);
    }

    #[test]
    fn clip_span_helpers() {
        let track = Track::new(TrackKind::Main, "Main 1");
        let mut clip = Clip::from_asset(
            &asset(MediaKind::Video, Some(10.0)),
            &track,
            TimeUs::from_seconds(2.0),
            TimeUs::from_seconds(4.0),
        );
        assert_eq!(clip.end(), TimeUs::from_seconds(6.0));
        assert!(clip.contains(TimeUs::from_seconds(2.0)));
        assert!(!clip.contains(TimeUs::from_seconds(6.0)));
        assert!(!clip.strictly_contains(TimeUs::from_seconds(2.0)));
        assert!(clip.strictly_contains(TimeUs::from_seconds(3.0)));

        clip.source_in = TimeUs::from_seconds(1.0);
        assert_eq!(
            clip.source_time_at(TimeUs::from_seconds(3.0)),
            TimeUs::from_seconds(2.0)
        );
    }

    #[test]
    fn trim_start_keeps_end_and_moves_in_point() {
        let track = Track::new(TrackKind::Main, "Main 1");
        let mut clip = Clip::from_asset(
            &asset(MediaKind::Video, Some(10.0)),
            &track,
            TimeUs::from_seconds(2.0),
            TimeUs::from_seconds(4.0),
        );
        clip.trim_start_to(TimeUs::from_seconds(3.0));
        assert_eq!(clip.end(), TimeUs::from_seconds(6.0));
        assert_eq!(clip.duration, TimeUs::from_seconds(3.0));
        assert_eq!(clip.source_in, TimeUs::from_seconds(1.0));

        // Extending past the original in-point pins the in-point at zero.
        clip.trim_start_to(TimeUs::from_seconds(0.5));
        assert_eq!(clip.source_in, TimeUs::ZERO);
        assert_eq!(clip.duration, TimeUs::from_seconds(5.5));
    }

    #[test]
    fn adjacent_clips_dont_overlap() {
        let track = Track::new(TrackKind::Main, "Main 1");
        let a = Clip::from_asset(&asset(MediaKind::Video, None), &track, TimeUs(0), TimeUs(5_000_000));
        let b = Clip::from_asset(
            &asset(MediaKind::Video, None),
            &track,
            TimeUs(5_000_000),
            TimeUs(5_000_000),
        );
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        let c = Clip::from_asset(
            &asset(MediaKind::Video, None),
            &track,
            TimeUs(4_999_999),
            TimeUs(5_000_000),
        );
        assert!(a.overlaps(&c));
    }

    #[test]
    fn clips_on_different_tracks_never_overlap() {
        let t1 = Track::new(TrackKind::Main, "Main 1");
        let t2 = Track::new(TrackKind::Main, "Main 2");
        let a = Clip::from_asset(&asset(MediaKind::Video, None), &t1, TimeUs(0), TimeUs(5_000_000));
        let b = Clip::from_asset(&asset(MediaKind::Video, None), &t2, TimeUs(0), TimeUs(5_000_000));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn serde_roundtrip_clip() {
        let track = Track::new(TrackKind::Audio, "Audio 1");
        let clip = Clip::from_asset(
            &asset(MediaKind::Audio, Some(3.0)),
            &track,
            TimeUs(1_000_000),
            TimeUs(3_000_000),
        );
        let json = serde_json::to_string(&clip).unwrap();
        let back: Clip = serde_json::from_str(&json).unwrap();
        assert_eq!(clip, back);
    }
}
