use crate::element::MediaElement;
use crate::error::Result;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// A pooled element and what it was last told to do.
pub struct Pooled<E> {
    pub element: E,
    pub source: String,
    pub playing: bool,
}

impl<E: MediaElement> Pooled<E> {
    pub fn play(&mut self) -> Result<()> {
        if !self.playing {
            self.element.play()?;
            self.playing = true;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.playing {
            self.element.pause()?;
            self.playing = false;
        }
        Ok(())
    }
}

/// Clip id → element, created on first use and disposed when the clip goes away.
pub struct ElementPool<E> {
    entries: BTreeMap<Uuid, Pooled<E>>,
}

impl<E> Default for ElementPool<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<E: MediaElement> ElementPool<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element for `clip_id` loaded with `source`, creating it if needed.
    pub fn get_or_create(
        &mut self,
        clip_id: Uuid,
        source: &str,
        create: impl FnOnce() -> Result<E>,
    ) -> Result<&mut Pooled<E>> {
        let entry = match self.entries.entry(clip_id) {
            Entry::Occupied(o) => o.into_mut(),
            Entry::Vacant(v) => {
                let mut element = create()?;
                element.load(source)?;
                debug!(clip = %clip_id, "media element created");
                v.insert(Pooled {
                    element,
                    source: source.to_string(),
                    playing: false,
                })
            }
        };
        if entry.source != source {
            entry.element.load(source)?;
            entry.source = source.to_string();
            entry.playing = false;
        }
        Ok(entry)
    }

    pub fn get_mut(&mut self, clip_id: Uuid) -> Option<&mut Pooled<E>> {
        self.entries.get_mut(&clip_id)
    }

    pub fn contains(&self, clip_id: Uuid) -> bool {
        self.entries.contains_key(&clip_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Uuid, &mut Pooled<E>)> {
        self.entries.iter_mut()
    }

    /// Pause and dispose the element of `clip_id`.
    pub fn release(&mut self, clip_id: Uuid) -> bool {
        match self.entries.remove(&clip_id) {
            Some(mut entry) => {
                if let Err(e) = entry.pause() {
                    warn!(clip = %clip_id, error = %e, "pause before dispose failed");
                }
                debug!(clip = %clip_id, "media element disposed");
                true
            }
            None => false,
        }
    }

    /// Dispose every element whose clip is no longer alive. Returns the released ids.
    pub fn retain_live(&mut self, mut alive: impl FnMut(Uuid) -> bool) -> Vec<Uuid> {
        let dead: Vec<Uuid> = self.entries.keys().copied().filter(|id| !alive(*id)).collect();
        for id in &dead {
            self.release(*id);
        }
        dead
    }

    pub fn dispose_all(&mut self) {
        let ids: Vec<Uuid> = self.entries.keys().copied().collect();
        for id in ids {
            self.release(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::fake::{Call, FakeBackend};
    use crate::element::MediaBackend;
    use reelcraft_core::types::MediaKind;

    #[test]
    fn elements_are_created_once_per_clip() {
        let mut backend = FakeBackend::default();
        let mut pool = ElementPool::new();
        let id = Uuid::new_v4();

        pool.get_or_create(id, "a.mp3", || backend.create_element(MediaKind::Audio))
            .unwrap();
        pool.get_or_create(id, "a.mp3", || backend.create_element(MediaKind::Audio))
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(backend.created.borrow().len(), 1);
        let state = backend.element_for("a.mp3").unwrap();
        assert_eq!(state.borrow().calls, vec![Call::Load("a.mp3".into())]);
    }

    #[test]
    fn play_and_pause_are_not_repeated() {
        let mut backend = FakeBackend::default();
        let mut pool = ElementPool::new();
        let id = Uuid::new_v4();
        let entry = pool
            .get_or_create(id, "a.mp3", || backend.create_element(MediaKind::Audio))
            .unwrap();
        entry.play().unwrap();
        entry.play().unwrap();
        entry.pause().unwrap();
        entry.pause().unwrap();
        let state = backend.element_for("a.mp3").unwrap();
        let plays = state.borrow().calls.iter().filter(|c| **c == Call::Play).count();
        let pauses = state.borrow().calls.iter().filter(|c| **c == Call::Pause).count();
        assert_eq!((plays, pauses), (1, 1));
    }

    #[test]
    fn retain_live_disposes_removed_clips() {
        let mut backend = FakeBackend::default();
        let mut pool = ElementPool::new();
        let keep = Uuid::new_v4();
        let gone = Uuid::new_v4();
        pool.get_or_create(keep, "keep.mp3", || backend.create_element(MediaKind::Audio))
            .unwrap();
        pool.get_or_create(gone, "gone.mp3", || backend.create_element(MediaKind::Audio))
            .unwrap()
            .play()
            .unwrap();
        let gone_state = backend.element_for("gone.mp3").unwrap();

        assert_eq!(pool.retain_live(|id| id == keep), vec![gone]);
        assert!(gone_state.borrow().dropped);
        assert!(!gone_state.borrow().playing);
        assert!(pool.contains(keep));

        pool.dispose_all();
        assert!(pool.is_empty());
        assert_eq!(backend.live_count(), 0);
    }
}
