//! Recurring timers owned explicitly by the editor and the playback synchronizer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Identifies one started interval. Firings carry it back to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Host timer facility.
///
/// Implementations deliver a firing for every elapsed `period` until
/// `cancel` is called; a cancelled id never fires again.
pub trait Scheduler {
    fn start_interval(&mut self, period: Duration) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// Scheduler that records calls and never fires on its own. Hosts that drive
/// ticks by hand (tests, offline tools) use it.
///
/// Clones share one id sequence and one set of active timers.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    next: u64,
    active: Vec<(TimerId, Duration)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.state.borrow().active.iter().any(|(t, _)| *t == id)
    }

    pub fn active_count(&self) -> usize {
        self.state.borrow().active.len()
    }

    pub fn period(&self, id: TimerId) -> Option<Duration> {
        self.state
            .borrow()
            .active
            .iter()
            .find(|(t, _)| *t == id)
            .map(|(_, p)| *p)
    }
}

impl Scheduler for ManualScheduler {
    fn start_interval(&mut self, period: Duration) -> TimerId {
        let mut state = self.state.borrow_mut();
        state.next += 1;
        let id = TimerId(state.next);
        state.active.push((id, period));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.state.borrow_mut().active.retain(|(t, _)| *t != id);
    }
}
