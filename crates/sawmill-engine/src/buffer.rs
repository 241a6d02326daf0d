//! Buffered ingestion with high-water and timer driven flushing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sawmill_model::LogEntry;
use sawmill_store::EntryStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, warn};

use crate::config::BufferConfig;
use crate::error::{EngineError, Result};

/// Write-behind buffer for entries that tolerate a short persistence delay.
///
/// Entries accumulate under a mutex until either the high-water mark is
/// reached or the flush timer fires, then the whole batch goes to the store
/// in one write. A failed or timed-out write drops its batch; there is no
/// retry.
#[derive(Debug)]
pub struct IngestBuffer<S> {
    store: Arc<S>,
    config: BufferConfig,
    pending: Mutex<Vec<LogEntry>>,
    flushed_entries: AtomicU64,
    failed_flushes: AtomicU64,
}

impl<S: EntryStore> IngestBuffer<S> {
    /// Creates a buffer in front of the given store.
    pub fn new(store: Arc<S>, config: BufferConfig) -> Self {
        Self {
            store,
            config,
            pending: Mutex::new(Vec::new()),
            flushed_entries: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
        }
    }

    /// Queues an entry. Returns true when the buffer has reached its
    /// high-water mark and wants a flush.
    pub fn submit(&self, entry: LogEntry) -> bool {
        let mut pending = self.pending.lock();
        pending.push(entry);
        pending.len() >= self.config.high_water_mark
    }

    /// Number of entries waiting to be flushed.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total number of entries flushed successfully.
    #[must_use]
    pub fn flushed_entries(&self) -> u64 {
        self.flushed_entries.load(Ordering::Relaxed)
    }

    /// Number of flush attempts that failed or timed out.
    #[must_use]
    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes.load(Ordering::Relaxed)
    }

    /// Writes all pending entries as a single batch.
    ///
    /// The pending list is swapped out before the write, so new submissions
    /// accumulate in a fresh list while the write is in flight. Returns the
    /// number of entries written.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch write fails or exceeds the write
    /// timeout. The batch is dropped either way.
    pub async fn flush(&self) -> Result<usize> {
        let batch = {
            let mut pending = self.pending.lock();
            std::mem::take(&mut *pending)
        };
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        match tokio::time::timeout(self.config.write_timeout, self.store.create_batch(&batch)).await
        {
            Ok(Ok(())) => {
                self.flushed_entries.fetch_add(count as u64, Ordering::Relaxed);
                debug!(count, "buffer flushed");
                Ok(count)
            }
            Ok(Err(err)) => {
                self.failed_flushes.fetch_add(1, Ordering::Relaxed);
                warn!(count, error = %err, "buffer flush failed, dropping batch");
                Err(err.into())
            }
            Err(_) => {
                self.failed_flushes.fetch_add(1, Ordering::Relaxed);
                warn!(
                    count,
                    timeout = ?self.config.write_timeout,
                    "buffer flush timed out, dropping batch"
                );
                Err(EngineError::FlushTimeout(self.config.write_timeout))
            }
        }
    }

    /// Spawns the periodic flush task. The first flush happens one full
    /// interval after startup; the task stops on the shutdown signal.
    pub fn spawn_flush_task(
        self: &Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let buffer = Arc::clone(self);
        tokio::spawn(async move {
            let period = buffer.config.flush_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Failures are logged inside flush.
                        let _ = buffer.flush().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("flush task stopping");
                        break;
                    }
                }
            }
        })
    }
}
