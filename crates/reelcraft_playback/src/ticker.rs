//! Tokio-backed [`Scheduler`]: each interval is a task that posts
//! [`TimerFired`] onto a channel the host loop drains.

use reelcraft_core::timer::{Scheduler, TimerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired(pub TimerId);

/// Clones share the id sequence and the task table, so ids never collide
/// between the editor and the synchronizer.
///
/// `start_interval` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerFired>,
    next: Arc<AtomicU64>,
    tasks: Arc<Mutex<HashMap<TimerId, JoinHandle<()>>>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            next: Arc::new(AtomicU64::new(0)),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        };
        (scheduler, rx)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Abort every running interval.
    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (_, handle) in tasks.drain() {
                handle.abort();
            }
        }
    }
}

impl Scheduler for TokioScheduler {
    fn start_interval(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(TimerFired(id)).is_err() {
                    break;
                }
            }
        });
        match self.tasks.lock() {
            Ok(mut tasks) => {
                tasks.insert(id, handle);
            }
            Err(_) => {
                warn!(timer = id.0, "timer table poisoned; interval not tracked");
                handle.abort();
            }
        }
        debug!(timer = id.0, period_ms = period.as_millis() as u64, "interval started");
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let handle = self.tasks.lock().ok().and_then(|mut t| t.remove(&id));
        if let Some(handle) = handle {
            handle.abort();
            debug!(timer = id.0, "interval cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn interval_posts_firings_until_cancelled() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let id = scheduler.start_interval(Duration::from_millis(5));

        let fired = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(fired, Some(TimerFired(id)));

        scheduler.cancel(id);
        assert_eq!(scheduler.active_count(), 0);
        while rx.try_recv().is_ok() {}
        sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn clones_hand_out_distinct_ids() {
        let (mut a, _rx) = TokioScheduler::new();
        let mut b = a.clone();
        let first = a.start_interval(Duration::from_millis(50));
        let second = b.start_interval(Duration::from_millis(50));
        assert_ne!(first, second);
        assert_eq!(a.active_count(), 2);

        b.cancel(first);
        assert_eq!(a.active_count(), 1);
        a.shutdown();
        assert_eq!(b.active_count(), 0);
    }
}
