//! Polling tail stream over newly ingested entries.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures::Stream;
use sawmill_model::{LogEntry, LogFilter, TimeRange};
use sawmill_store::{EntryStore, ResultCache};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::cache::CachedQueries;

/// Entries buffered between the poller and a slow consumer.
const TAIL_CHANNEL_CAPACITY: usize = 256;

/// Async stream of log entries matching a filter.
///
/// Yields entries ingested after the stream was created, oldest first
/// within each poll window. Dropping the stream stops its poller.
#[derive(Debug)]
pub struct LogTail {
    rx: mpsc::Receiver<LogEntry>,
}

impl Stream for LogTail {
    type Item = LogEntry;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Spawns a poller that repeatedly queries the window since its last pass
/// and forwards matches to the returned stream.
///
/// Each poll covers `[watermark, now)`. The watermark only advances on a
/// successful poll, so a failed query is retried over the same window.
pub(crate) fn spawn_tail_task<S: EntryStore, C: ResultCache>(
    queries: Arc<CachedQueries<S, C>>,
    filter: LogFilter,
    poll_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> LogTail {
    let (tx, rx) = mpsc::channel(TAIL_CHANNEL_CAPACITY);
    // The watermark is fixed before the task is handed to the runtime so
    // that entries ingested while the poller is still waiting to be
    // scheduled fall inside its first window.
    let mut watermark = Utc::now();
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + poll_interval;
        let mut ticker = tokio::time::interval_at(start, poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let window = filter
                        .clone()
                        .with_time_range(TimeRange::new(Some(watermark), Some(now)))
                        .with_page(1)
                        .with_page_size(LogFilter::MAX_PAGE_SIZE);
                    match queries.query(&window).await {
                        Ok(result) => {
                            // Results arrive newest first; the stream emits
                            // oldest first.
                            for entry in result.entries.into_iter().rev() {
                                if tx.send(entry).await.is_err() {
                                    return;
                                }
                            }
                            watermark = now;
                        }
                        Err(err) => {
                            debug!(error = %err, "tail poll failed, retrying same window");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("tail poller shutting down");
                    return;
                }
            }
        }
    });
    LogTail { rx }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use sawmill_model::{LogLevel, TenantId};
    use sawmill_store::{MemoryEntryStore, NoopCache};

    use super::*;
    use crate::config::CacheConfig;

    fn make_entry(tenant: TenantId, message: &str, at: chrono::DateTime<Utc>) -> LogEntry {
        let mut entry = LogEntry::builder()
            .tenant_id(tenant)
            .service_name("api")
            .level(LogLevel::Info)
            .message(message)
            .timestamp(at)
            .build()
            .expect("build entry");
        entry.id = Some(uuid::Uuid::new_v4());
        entry
    }

    fn tail_over(
        store: &MemoryEntryStore,
        filter: LogFilter,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> LogTail {
        let queries = Arc::new(CachedQueries::new(
            Arc::new(store.clone()),
            Arc::new(NoopCache::new()),
            CacheConfig::default(),
        ));
        spawn_tail_task(queries, filter, Duration::from_millis(25), shutdown_rx)
    }

    #[tokio::test]
    async fn test_tail_emits_entries_ingested_after_start() {
        let store = MemoryEntryStore::new();
        let tenant = TenantId::new();
        let (shutdown_tx, _) = broadcast::channel(1);

        let mut tail = tail_over(
            &store,
            LogFilter::new().with_tenant(tenant),
            shutdown_tx.subscribe(),
        );

        store
            .create(&make_entry(tenant, "fresh", Utc::now()))
            .await
            .expect("create");

        let entry = tokio::time::timeout(Duration::from_secs(1), tail.next())
            .await
            .expect("tail produced nothing")
            .expect("stream ended");
        assert_eq!(entry.message, "fresh");
    }

    #[tokio::test]
    async fn test_tail_skips_preexisting_entries() {
        let store = MemoryEntryStore::new();
        let tenant = TenantId::new();
        store
            .create(&make_entry(
                tenant,
                "old",
                Utc::now() - chrono::Duration::seconds(5),
            ))
            .await
            .expect("create");

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tail = tail_over(&store, LogFilter::new(), shutdown_tx.subscribe());

        let timed_out = tokio::time::timeout(Duration::from_millis(120), tail.next())
            .await
            .is_err();
        assert!(timed_out);
    }

    #[tokio::test]
    async fn test_tail_does_not_reemit() {
        let store = MemoryEntryStore::new();
        let tenant = TenantId::new();
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tail = tail_over(&store, LogFilter::new(), shutdown_tx.subscribe());

        store
            .create(&make_entry(tenant, "once", Utc::now()))
            .await
            .expect("create");

        let first = tokio::time::timeout(Duration::from_secs(1), tail.next())
            .await
            .expect("tail produced nothing")
            .expect("stream ended");
        assert_eq!(first.message, "once");

        // Several more poll windows pass without the entry reappearing.
        let timed_out = tokio::time::timeout(Duration::from_millis(120), tail.next())
            .await
            .is_err();
        assert!(timed_out);
    }

    #[tokio::test]
    async fn test_tail_emits_oldest_first() {
        let store = MemoryEntryStore::new();
        let tenant = TenantId::new();
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tail = tail_over(&store, LogFilter::new(), shutdown_tx.subscribe());

        let base = Utc::now();
        store
            .create(&make_entry(tenant, "first", base))
            .await
            .expect("create");
        store
            .create(&make_entry(
                tenant,
                "second",
                base + chrono::Duration::milliseconds(1),
            ))
            .await
            .expect("create");

        let a = tokio::time::timeout(Duration::from_secs(1), tail.next())
            .await
            .expect("tail produced nothing")
            .expect("stream ended");
        let b = tokio::time::timeout(Duration::from_secs(1), tail.next())
            .await
            .expect("tail produced nothing")
            .expect("stream ended");
        assert_eq!(a.message, "first");
        assert_eq!(b.message, "second");
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let store = MemoryEntryStore::new();
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tail = tail_over(&store, LogFilter::new(), shutdown_tx.subscribe());

        let _ = shutdown_tx.send(());

        let next = tokio::time::timeout(Duration::from_secs(1), tail.next())
            .await
            .expect("stream did not end");
        assert!(next.is_none());
    }
}
