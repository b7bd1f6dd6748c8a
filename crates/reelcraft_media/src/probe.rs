//! Asynchronous media metadata probes.
//!
//! A probe never blocks editing: the clip keeps its placeholder length until an
//! accepted result arrives. Failures and timeouts resolve to zero metadata.

use crate::error::{MediaError, Result};
use reelcraft_core::config::EngineConfig;
use reelcraft_core::types::{AssetDescriptor, TimeUs};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub duration: TimeUs,
    pub width: u32,
    pub height: u32,
}

/// Reads duration and dimensions of the media at a URL.
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = Result<MediaMetadata>> + Send + 'static;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub request: RequestId,
    pub media_id: String,
    pub metadata: MediaMetadata,
}

/// Runs probes as tokio tasks and decides which results may still be applied.
///
/// One request per media id is in flight at a time; a newer request aborts
/// the older task. After [`ProbeTracker::shutdown`] nothing is accepted.
pub struct ProbeTracker<P: Prober> {
    prober: Arc<P>,
    timeout: Duration,
    next: u64,
    pending: HashMap<String, (RequestId, JoinHandle<()>)>,
    tx: mpsc::UnboundedSender<ProbeOutcome>,
    closed: bool,
}

impl<P: Prober> ProbeTracker<P> {
    pub fn new(prober: P, config: &EngineConfig) -> (Self, mpsc::UnboundedReceiver<ProbeOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Self {
            prober: Arc::new(prober),
            timeout: Duration::from_millis(config.probe_timeout_ms),
            next: 0,
            pending: HashMap::new(),
            tx,
            closed: false,
        };
        (tracker, rx)
    }

    /// Start probing `asset`. Must be called from within a tokio runtime.
    pub fn request(&mut self, asset: &AssetDescriptor) -> Option<RequestId> {
        if self.closed {
            return None;
        }
        self.next += 1;
        let id = RequestId(self.next);
        if let Some((old, handle)) = self.pending.remove(&asset.id) {
            handle.abort();
            debug!(media = %asset.id, request = old.0, "superseded probe aborted");
        }

        let probe = self.prober.probe(&asset.url);
        let timeout = self.timeout;
        let tx = self.tx.clone();
        let media_id = asset.id.clone();
        let handle = tokio::spawn(async move {
            let metadata = match tokio::time::timeout(timeout, probe).await {
                Ok(Ok(metadata)) => metadata,
                Ok(Err(e)) => {
                    warn!(media = %media_id, error = %e, "probe failed; using zero metadata");
                    MediaMetadata::default()
                }
                Err(_) => {
                    warn!(media = %media_id, error = %MediaError::ProbeTimedOut, "using zero metadata");
                    MediaMetadata::default()
                }
            };
            let _ = tx.send(ProbeOutcome {
                request: id,
                media_id,
                metadata,
            });
        });
        self.pending.insert(asset.id.clone(), (id, handle));
        Some(id)
    }

    /// Whether `outcome` is the current result for its media. Accepting it
    /// clears the pending entry.
    pub fn accept(&mut self, outcome: &ProbeOutcome) -> bool {
        if self.closed {
            debug!(media = %outcome.media_id, "probe result after shutdown discarded");
            return false;
        }
        match self.pending.get(&outcome.media_id) {
            Some((id, _)) if *id == outcome.request => {
                self.pending.remove(&outcome.media_id);
                true
            }
            _ => {
                warn!(media = %outcome.media_id, request = outcome.request.0, "stale probe result discarded");
                false
            }
        }
    }

    pub fn is_pending(&self, media_id: &str) -> bool {
        self.pending.contains_key(media_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Abort every in-flight probe and refuse all later results.
    pub fn shutdown(&mut self) {
        self.closed = true;
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }
}
