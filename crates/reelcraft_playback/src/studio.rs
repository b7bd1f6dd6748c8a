//! Editor plus playback behind one event surface.
//!
//! Hosts forward keyboard input, timer firings and edits here. After every
//! edit the synchronizer re-resolves live content, so elements of removed
//! clips are released immediately.

use crate::element::MediaBackend;
use crate::error::Result;
use crate::sync::PlaybackSynchronizer;
use reelcraft_core::config::EngineConfig;
use reelcraft_core::interaction::{Editor, PointerPos};
use reelcraft_core::keyboard::{map_key, KeyCommand, KeyInput};
use reelcraft_core::snapshot::RenderRequest;
use reelcraft_core::timer::{Scheduler, TimerId};
use reelcraft_core::types::{AssetDescriptor, TimeUs};
use tracing::debug;
use uuid::Uuid;

pub struct Studio<B: MediaBackend, S: Scheduler + Clone> {
    editor: Editor<S>,
    playback: PlaybackSynchronizer<B, S>,
}

impl<B: MediaBackend, S: Scheduler + Clone> Studio<B, S> {
    pub fn new(config: EngineConfig, backend: B, scheduler: S, viewport_width: f64) -> Result<Self> {
        let playback = PlaybackSynchronizer::new(backend, scheduler.clone(), &config)?;
        let editor = Editor::new(config, scheduler, viewport_width);
        Ok(Self { editor, playback })
    }

    pub fn editor(&self) -> &Editor<S> {
        &self.editor
    }

    pub fn playback(&self) -> &PlaybackSynchronizer<B, S> {
        &self.playback
    }

    pub fn playhead(&self) -> TimeUs {
        self.playback.current_time()
    }

    /// Run an edit against the editor, then re-sync playback with the result.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Editor<S>) -> R) -> R {
        let out = f(&mut self.editor);
        self.playback.refresh(self.editor.timeline());
        out
    }

    /// Handle a key press. Returns the command it mapped to, if any.
    pub fn handle_key(&mut self, input: &KeyInput) -> Option<KeyCommand> {
        let command = map_key(input)?;
        let playhead = self.playhead();
        let outcome = match command {
            KeyCommand::DeleteSelected => self.edit(|ed| ed.delete_selected().map(|_| ())),
            KeyCommand::Split => self.edit(|ed| ed.split(playhead).map(|_| ())),
            KeyCommand::Copy => self.editor.copy(),
            KeyCommand::Paste => self.edit(|ed| ed.paste(playhead).map(|_| ())),
            KeyCommand::TogglePlay => {
                self.playback.toggle(self.editor.timeline());
                Ok(())
            }
            KeyCommand::Seek(delta) => {
                self.playback.seek_by(self.editor.timeline(), delta);
                Ok(())
            }
            KeyCommand::OpenHelp => {
                self.editor.open_help();
                Ok(())
            }
            KeyCommand::Escape => {
                self.editor.escape();
                Ok(())
            }
        };
        if let Err(e) = outcome {
            debug!(?command, error = %e, "key command ignored");
        }
        Some(command)
    }

    /// Route a timer firing to whichever side owns it.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        self.editor.on_timer(id) || self.playback.on_tick(self.editor.timeline(), id)
    }

    pub fn seek(&mut self, t: TimeUs) {
        self.playback.seek(self.editor.timeline(), t);
    }

    pub fn add_asset(&mut self, asset: &AssetDescriptor) -> Option<Uuid> {
        let playhead = self.playhead();
        self.edit(|ed| ed.add_asset(asset, playhead))
    }

    pub fn drop_at_playhead(&mut self) -> Option<Uuid> {
        let playhead = self.playhead();
        self.edit(|ed| ed.drop_at(playhead))
    }

    pub fn double_click(&mut self, pointer: PointerPos) -> Option<Uuid> {
        self.edit(|ed| ed.double_click(pointer))
    }

    pub fn apply_media_duration(&mut self, media_id: &str, duration: TimeUs) -> Vec<Uuid> {
        self.edit(|ed| ed.apply_media_duration(media_id, duration))
    }

    pub fn render_request(&self) -> RenderRequest {
        self.editor.render_request()
    }

    pub fn teardown(&mut self) {
        self.editor.cancel_drag();
        self.playback.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::fake::FakeBackend;
    use reelcraft_core::keyboard::{Key, Modifiers};
    use reelcraft_core::timer::ManualScheduler;
    use reelcraft_core::types::MediaKind;

    fn studio() -> (Studio<FakeBackend, ManualScheduler>, FakeBackend, ManualScheduler) {
        let backend = FakeBackend::default();
        let scheduler = ManualScheduler::new();
        let studio = Studio::new(EngineConfig::default(), backend.clone(), scheduler.clone(), 1000.0).unwrap();
        (studio, backend, scheduler)
    }

    fn audio(name: &str, secs: f64) -> AssetDescriptor {
        AssetDescriptor {
            id: name.to_string(),
            name: name.to_string(),
            kind: MediaKind::Audio,
            url: format!("{name}.mp3"),
            duration: Some(secs),
            width: None,
            height: None,
        }
    }

    fn key(k: Key) -> KeyInput {
        KeyInput::new(k, Modifiers::NONE)
    }

    fn ctrl(c: char) -> KeyInput {
        KeyInput::new(
            Key::Char(c),
            Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        )
    }

    #[test]
    fn space_toggles_and_ticks_route_to_playback() {
        let (mut s, _, scheduler) = studio();
        assert_eq!(s.handle_key(&key(Key::Space)), Some(KeyCommand::TogglePlay));
        assert!(s.playback().is_playing());
        assert_eq!(scheduler.active_count(), 1);

        assert!(s.on_timer(TimerId(1)));
        assert_eq!(s.playhead(), TimeUs::from_seconds(0.1));
        assert!(!s.on_timer(TimerId(42)));

        s.handle_key(&key(Key::Space));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn arrows_seek_the_playhead() {
        let (mut s, _, _) = studio();
        s.handle_key(&KeyInput::new(
            Key::ArrowRight,
            Modifiers {
                shift: true,
                ..Modifiers::NONE
            },
        ));
        assert_eq!(s.playhead(), TimeUs::from_seconds(1.0));
        s.handle_key(&key(Key::ArrowLeft));
        assert_eq!(s.playhead(), TimeUs::from_seconds(0.9));
    }

    #[test]
    fn delete_key_releases_audio_element() {
        let (mut s, backend, _) = studio();
        let id = s.add_asset(&audio("vo", 10.0)).unwrap();
        assert_eq!(s.playback().audio_elements(), 1);
        let element = backend.element_for("vo.mp3").unwrap();

        s.edit(|ed| ed.select(Some(id)));
        s.handle_key(&key(Key::Delete));
        assert!(s.editor().timeline().clips.is_empty());
        assert_eq!(s.playback().audio_elements(), 0);
        assert!(element.borrow().dropped);
    }

    #[test]
    fn split_copy_paste_use_the_playhead() {
        let (mut s, _, _) = studio();
        let id = s.add_asset(&audio("vo", 10.0)).unwrap();
        s.edit(|ed| ed.select(Some(id)));
        s.seek(TimeUs::from_seconds(4.0));

        assert_eq!(s.handle_key(&ctrl('b')), Some(KeyCommand::Split));
        assert_eq!(s.editor().timeline().clips.len(), 2);
        assert_eq!(s.editor().timeline().clip(id).unwrap().duration, TimeUs::from_seconds(4.0));

        s.handle_key(&ctrl('c'));
        s.seek(TimeUs::from_seconds(20.0));
        s.handle_key(&ctrl('v'));
        let pasted = s.editor().selected().unwrap();
        assert_ne!(pasted, id);
        assert_eq!(s.editor().timeline().clip(pasted).unwrap().start, TimeUs::from_seconds(20.0));
    }

    #[test]
    fn failed_commands_are_swallowed() {
        let (mut s, _, _) = studio();
        assert_eq!(s.handle_key(&ctrl('v')), Some(KeyCommand::Paste));
        assert_eq!(s.handle_key(&key(Key::Delete)), Some(KeyCommand::DeleteSelected));
        assert!(s.editor().timeline().clips.is_empty());
    }

    #[test]
    fn help_and_escape() {
        let (mut s, _, _) = studio();
        s.handle_key(&key(Key::Char('?')));
        assert!(s.editor().is_help_open());
        s.handle_key(&key(Key::Escape));
        assert!(!s.editor().is_help_open());
    }

    #[test]
    fn teardown_stops_all_timers() {
        let (mut s, _, scheduler) = studio();
        s.add_asset(&audio("vo", 10.0));
        s.handle_key(&key(Key::Space));
        s.teardown();
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(s.playback().audio_elements(), 0);
    }
}
