//! Keeps the preview surface and every audio/overlay element aligned with
//! one virtual play-head.
//!
//! The synchronizer never owns the timeline. Every entry point takes the
//! current committed [`Timeline`] and re-resolves what is live from it.

use crate::element::{MediaBackend, MediaElement, PreviewContent};
use crate::error::Result;
use crate::pool::{ElementPool, Pooled};
use reelcraft_core::config::EngineConfig;
use reelcraft_core::timer::{Scheduler, TimerId};
use reelcraft_core::types::*;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How strictly element positions are brought back to the play-head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    /// Seek only when drift exceeds the tolerance.
    Drift,
    /// Seek every live element.
    Force,
}

pub struct PlaybackSynchronizer<B: MediaBackend, S: Scheduler> {
    backend: B,
    scheduler: S,
    main: Pooled<B::Element>,
    main_clip: Option<Uuid>,
    preview: PreviewContent,
    audio: ElementPool<B::Element>,
    overlay_video: ElementPool<B::Element>,
    current_time: TimeUs,
    playing: bool,
    ticker: Option<TimerId>,
    master_volume: f64,
    muted: bool,
    tick_step: TimeUs,
    tick_period: Duration,
    drift_tolerance: TimeUs,
}

impl<B: MediaBackend, S: Scheduler> PlaybackSynchronizer<B, S> {
    pub fn new(mut backend: B, scheduler: S, config: &EngineConfig) -> Result<Self> {
        let element = backend.create_element(MediaKind::Video)?;
        Ok(Self {
            backend,
            scheduler,
            main: Pooled {
                element,
                source: String::new(),
                playing: false,
            },
            main_clip: None,
            preview: PreviewContent::Empty,
            audio: ElementPool::new(),
            overlay_video: ElementPool::new(),
            current_time: TimeUs::ZERO,
            playing: false,
            ticker: None,
            master_volume: 1.0,
            muted: false,
            tick_step: config.tick_step(),
            tick_period: Duration::from_millis(config.tick_interval_ms),
            drift_tolerance: config.drift_tolerance,
        })
    }

    pub fn current_time(&self) -> TimeUs {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn preview(&self) -> &PreviewContent {
        &self.preview
    }

    pub fn main_clip(&self) -> Option<Uuid> {
        self.main_clip
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn audio_elements(&self) -> usize {
        self.audio.len()
    }

    pub fn overlay_video_elements(&self) -> usize {
        self.overlay_video.len()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn owns_timer(&self, id: TimerId) -> bool {
        self.ticker == Some(id)
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Start playback. At the end of the timeline it restarts from zero.
    pub fn play(&mut self, timeline: &Timeline) {
        if self.playing {
            return;
        }
        let align = if self.current_time >= timeline.duration {
            self.current_time = TimeUs::ZERO;
            Align::Force
        } else {
            Align::Drift
        };
        self.playing = true;
        self.ticker = Some(self.scheduler.start_interval(self.tick_period));
        info!(at = %self.current_time, "playback started");
        self.sync_with(timeline, align);
    }

    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.stop_ticker();
        self.pause_all();
        info!(at = %self.current_time, "playback paused");
    }

    pub fn toggle(&mut self, timeline: &Timeline) {
        if self.playing {
            self.pause();
        } else {
            self.play(timeline);
        }
    }

    /// Jump the play-head, clamped to `[0, duration]`, and re-seek every live element.
    pub fn seek(&mut self, timeline: &Timeline, t: TimeUs) {
        self.current_time = t.max(TimeUs::ZERO).min(timeline.duration);
        debug!(at = %self.current_time, "seek");
        self.sync_with(timeline, Align::Force);
    }

    pub fn seek_by(&mut self, timeline: &Timeline, delta: TimeUs) {
        self.seek(timeline, self.current_time + delta);
    }

    /// Advance one ticker step. Returns false for timers this synchronizer doesn't own.
    pub fn on_tick(&mut self, timeline: &Timeline, id: TimerId) -> bool {
        if !self.owns_timer(id) {
            return false;
        }
        let next = self.current_time + self.tick_step;
        if next >= timeline.duration {
            self.current_time = timeline.duration;
            self.sync_with(timeline, Align::Drift);
            info!("reached end of timeline");
            self.pause();
        } else {
            self.current_time = next;
            self.sync_with(timeline, Align::Drift);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Mix
    // -----------------------------------------------------------------------

    pub fn set_master_volume(&mut self, timeline: &Timeline, volume: f64) {
        self.master_volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        self.sync_with(timeline, Align::Drift);
    }

    pub fn set_muted(&mut self, timeline: &Timeline, muted: bool) {
        self.muted = muted;
        self.sync_with(timeline, Align::Drift);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Re-resolve live content after the timeline was edited.
    pub fn refresh(&mut self, timeline: &Timeline) {
        self.sync_with(timeline, Align::Drift);
    }

    /// Dispose the element of a clip that was removed.
    pub fn release(&mut self, clip_id: Uuid) {
        self.audio.release(clip_id);
        self.overlay_video.release(clip_id);
        if self.main_clip == Some(clip_id) {
            self.main_clip = None;
            self.preview = PreviewContent::Empty;
            log_failure(self.main.pause(), "main pause");
        }
    }

    /// Stop the ticker and dispose every pooled element.
    pub fn teardown(&mut self) {
        self.playing = false;
        self.stop_ticker();
        log_failure(self.main.pause(), "main pause");
        self.audio.dispose_all();
        self.overlay_video.dispose_all();
        self.main_clip = None;
        self.preview = PreviewContent::Empty;
        info!("playback torn down");
    }

    fn stop_ticker(&mut self) {
        if let Some(id) = self.ticker.take() {
            self.scheduler.cancel(id);
        }
    }

    fn pause_all(&mut self) {
        log_failure(self.main.pause(), "main pause");
        for (id, entry) in self.audio.iter_mut().chain(self.overlay_video.iter_mut()) {
            if let Err(e) = entry.pause() {
                warn!(clip = %id, error = %e, "element pause failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sync pass
    // -----------------------------------------------------------------------

    fn mix(&self) -> Mix {
        Mix {
            playing: self.playing,
            master_volume: self.master_volume,
            muted: self.muted,
            drift_tolerance: self.drift_tolerance,
        }
    }

    fn sync_with(&mut self, timeline: &Timeline, align: Align) {
        let alive: HashSet<Uuid> = timeline.clips.iter().map(|c| c.id).collect();
        self.audio.retain_live(|id| alive.contains(&id));
        self.overlay_video.retain_live(|id| alive.contains(&id));

        let t = self.current_time;
        let live = timeline.live_at(t);
        self.sync_main(live.main, &live.overlays, align);

        let audio: Vec<&Clip> = live.audio;
        let overlay_videos: Vec<&Clip> = live
            .overlays
            .iter()
            .copied()
            .filter(|c| c.kind == MediaKind::Video)
            .collect();
        self.sync_pool(PoolKind::Audio, &audio, align);
        self.sync_pool(PoolKind::OverlayVideo, &overlay_videos, align);
    }

    fn sync_main(&mut self, main: Option<&Clip>, overlays: &[&Clip], align: Align) {
        let t = self.current_time;
        match main {
            Some(clip) if clip.kind == MediaKind::Video => {
                let swapped = self.main_clip != Some(clip.id) || self.main.source != clip.source_url;
                if self.main.source != clip.source_url {
                    info!(clip = %clip.id, url = %clip.source_url, "preview source switched");
                    match self.main.element.load(&clip.source_url) {
                        Ok(()) => {
                            self.main.source = clip.source_url.clone();
                            self.main.playing = false;
                        }
                        Err(e) => warn!(error = %e, "preview load failed"),
                    }
                }
                self.main_clip = Some(clip.id);
                self.preview = PreviewContent::Video {
                    clip_id: clip.id,
                    url: clip.source_url.clone(),
                };
                let align = if swapped { Align::Force } else { align };
                let mix = self.mix();
                drive(&mut self.main, clip, t, align, mix);
            }
            Some(clip) => {
                log_failure(self.main.pause(), "main pause");
                self.main_clip = Some(clip.id);
                self.preview = PreviewContent::Image {
                    clip_id: clip.id,
                    url: clip.source_url.clone(),
                };
            }
            None => {
                log_failure(self.main.pause(), "main pause");
                self.main_clip = None;
                self.preview = overlays
                    .iter()
                    .find(|c| c.kind == MediaKind::Image)
                    .map(|c| PreviewContent::Image {
                        clip_id: c.id,
                        url: c.source_url.clone(),
                    })
                    .unwrap_or_default();
            }
        }
    }

    fn sync_pool(&mut self, kind: PoolKind, live: &[&Clip], align: Align) {
        let t = self.current_time;
        let mix = self.mix();
        let backend = &mut self.backend;
        let pool = match kind {
            PoolKind::Audio => &mut self.audio,
            PoolKind::OverlayVideo => &mut self.overlay_video,
        };
        let element_kind = match kind {
            PoolKind::Audio => MediaKind::Audio,
            PoolKind::OverlayVideo => MediaKind::Video,
        };

        let live_ids: HashSet<Uuid> = live.iter().map(|c| c.id).collect();
        for clip in live {
            let entry = match pool.get_or_create(clip.id, &clip.source_url, || {
                backend.create_element(element_kind)
            }) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(clip = %clip.id, error = %e, "media element unavailable");
                    continue;
                }
            };
            drive(entry, clip, t, align, mix);
        }
        for (id, entry) in pool.iter_mut() {
            if !live_ids.contains(id) {
                if let Err(e) = entry.pause() {
                    warn!(clip = %id, error = %e, "element pause failed");
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PoolKind {
    Audio,
    OverlayVideo,
}

/// Transport and mix state applied to every live element in a pass.
#[derive(Debug, Clone, Copy)]
struct Mix {
    playing: bool,
    master_volume: f64,
    muted: bool,
    drift_tolerance: TimeUs,
}

/// Bring one live element in line with the play-head. Failures are logged and skipped.
fn drive<E: MediaElement>(entry: &mut Pooled<E>, clip: &Clip, t: TimeUs, align: Align, mix: Mix) {
    let expected = clip.source_time_at(t);
    let needs_seek = match align {
        Align::Force => true,
        Align::Drift => match entry.element.position() {
            Ok(pos) => (pos - expected).abs() > mix.drift_tolerance,
            Err(_) => true,
        },
    };
    if needs_seek {
        log_failure(entry.element.seek(expected), "element seek");
    }
    log_failure(entry.element.set_volume(clip.volume * mix.master_volume), "element volume");
    log_failure(entry.element.set_muted(mix.muted), "element mute");
    let transport = if mix.playing { entry.play() } else { entry.pause() };
    log_failure(transport, "element transport");
}

fn log_failure(result: Result<()>, what: &str) {
    if let Err(e) = result {
        warn!(error = %e, "{what} failed");
    }
}
