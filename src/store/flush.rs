//! Background snapshot flushing.
//!
//! The request path only marks the store dirty: it sends a unit signal into a
//! one-slot channel and returns. When the slot is already taken the request is
//! coalesced with the pending one. The flush thread captures the snapshot
//! itself, right before writing, so every write carries the newest state and
//! at most one write is ever pending. Failures are logged and dropped: the
//! next request writes a complete snapshot again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, TrySendError};
use std::thread;

use crate::error::StoreError;

use super::{KnowledgeStore, SnapshotStore, StoreResult};

/// Counters describing flusher activity.
#[derive(Debug, Default)]
pub struct FlushStats {
    pub requested: AtomicU64,
    /// Requests folded into an already pending flush.
    pub coalesced: AtomicU64,
    pub written: AtomicU64,
    pub failed: AtomicU64,
}

/// Handle to the background flush thread. Dropping it writes any pending
/// flush and joins the thread.
pub struct Flusher {
    tx: Option<mpsc::SyncSender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    stats: Arc<FlushStats>,
}

impl Flusher {
    /// Spawn the flush thread copying `source` into `sink`.
    pub fn spawn(source: Arc<KnowledgeStore>, sink: Arc<dyn SnapshotStore>) -> StoreResult<Self> {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let stats = Arc::new(FlushStats::default());
        let worker_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("noema-flush".into())
            .spawn(move || flush_loop(rx, source, sink, worker_stats))
            .map_err(|e| StoreError::Io { source: e })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            stats,
        })
    }

    /// Mark the store dirty. Never blocks and never copies the store.
    pub fn request(&self) -> StoreResult<()> {
        let tx = self.tx.as_ref().ok_or(StoreError::FlusherStopped)?;
        match tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(())) => return Err(StoreError::FlusherStopped),
        }
        self.stats.requested.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    /// Stop accepting requests, write whatever is pending and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("flush thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Flusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flusher")
            .field("running", &self.handle.is_some())
            .field("written", &self.stats.written.load(Ordering::Relaxed))
            .finish()
    }
}

fn flush_loop(
    rx: mpsc::Receiver<()>,
    source: Arc<KnowledgeStore>,
    sink: Arc<dyn SnapshotStore>,
    stats: Arc<FlushStats>,
) {
    while rx.recv().is_ok() {
        let snapshot = source.snapshot();
        match sink.save(&snapshot) {
            Ok(()) => {
                stats.written.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(log = snapshot.log.len(), "background flush complete");
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "background flush failed");
            }
        }
    }
}
