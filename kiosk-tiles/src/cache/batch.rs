//! Write coalescing for the render path.
//!
//! Tiles fetched while the map paints arrive one at a time in a hot loop.
//! Writing each one immediately costs a storage round trip per tile, so the
//! [`BatchWriteQueue`] collects them and flushes in groups:
//!
//! - as soon as `batch_size` tiles are pending, or
//! - `debounce` after the most recent enqueue,
//!
//! whichever happens first. A flush issues every save concurrently; one
//! failing tile is logged and counted but never holds up the rest.
//!
//! `enqueue` is synchronous and never waits on I/O. All storage work runs
//! on a background worker task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::traits::TileStore;
use crate::coord::TileIndex;

/// Default number of tiles that triggers an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default quiet period before pending tiles are flushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Batching thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub debounce: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl BatchConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Counters for queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub enqueued: u64,
    pub batches_flushed: u64,
    pub tiles_written: u64,
    pub write_failures: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    batches_flushed: AtomicU64,
    tiles_written: AtomicU64,
    write_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BatchStats {
        BatchStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            tiles_written: self.tiles_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

enum Command {
    Enqueue(TileIndex, Bytes),
    Flush(oneshot::Sender<()>),
}

enum Event {
    Shutdown,
    Command(Option<Command>),
    Deadline,
}

/// Coalesces tile saves into batches.
///
/// Must be created inside a tokio runtime; the worker is spawned on
/// construction.
pub struct BatchWriteQueue {
    tx: mpsc::UnboundedSender<Command>,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchWriteQueue {
    pub fn new(store: Arc<dyn TileStore>, config: BatchConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let shutdown = CancellationToken::new();

        let worker = tokio::spawn(run_worker(
            store,
            config,
            rx,
            Arc::clone(&counters),
            shutdown.clone(),
        ));

        Self {
            tx,
            counters,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a tile for persistence. Never blocks.
    pub fn enqueue(&self, tile: TileIndex, blob: Bytes) {
        if self.tx.send(Command::Enqueue(tile, blob)).is_err() {
            debug!(tile = %tile, "Batch queue closed, tile not persisted");
            return;
        }
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Write everything pending now and wait for the writes to settle.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Flush pending tiles and stop the worker.
    pub async fn shutdown(&self) {
        self.flush().await;
        self.shutdown.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Batch writer task failed");
            }
        }
    }

    pub fn stats(&self) -> BatchStats {
        self.counters.snapshot()
    }
}

impl Drop for BatchWriteQueue {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_worker(
    store: Arc<dyn TileStore>,
    config: BatchConfig,
    mut rx: mpsc::UnboundedReceiver<Command>,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
) {
    let mut pending: Vec<(TileIndex, Bytes)> = Vec::with_capacity(config.batch_size);
    let mut deadline: Option<Instant> = None;

    loop {
        let timer_deadline = deadline;
        let timer = async move {
            match timer_deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Event::Shutdown,
            command = rx.recv() => Event::Command(command),
            _ = timer => Event::Deadline,
        };

        match event {
            Event::Shutdown => {
                while let Ok(command) = rx.try_recv() {
                    if let Command::Enqueue(tile, blob) = command {
                        pending.push((tile, blob));
                    }
                }
                write_batch(&*store, &mut pending, &counters).await;
                break;
            }
            Event::Command(Some(Command::Enqueue(tile, blob))) => {
                pending.push((tile, blob));
                if pending.len() >= config.batch_size {
                    write_batch(&*store, &mut pending, &counters).await;
                    deadline = None;
                } else {
                    deadline = Some(Instant::now() + config.debounce);
                }
            }
            Event::Command(Some(Command::Flush(ack))) => {
                write_batch(&*store, &mut pending, &counters).await;
                deadline = None;
                let _ = ack.send(());
            }
            Event::Command(None) => {
                write_batch(&*store, &mut pending, &counters).await;
                break;
            }
            Event::Deadline => {
                write_batch(&*store, &mut pending, &counters).await;
                deadline = None;
            }
        }
    }
}

async fn write_batch(
    store: &dyn TileStore,
    pending: &mut Vec<(TileIndex, Bytes)>,
    counters: &Counters,
) {
    if pending.is_empty() {
        return;
    }

    let batch = std::mem::take(pending);
    let size = batch.len();

    let results = join_all(
        batch
            .into_iter()
            .map(|(tile, blob)| async move { (tile, store.save_tile(tile, blob).await) }),
    )
    .await;

    let mut failed = 0u64;
    for (tile, result) in results {
        if let Err(e) = result {
            failed += 1;
            warn!(tile = %tile, error = %e, "Failed to persist tile");
        }
    }

    counters.batches_flushed.fetch_add(1, Ordering::Relaxed);
    counters
        .tiles_written
        .fetch_add(size as u64 - failed, Ordering::Relaxed);
    counters.write_failures.fetch_add(failed, Ordering::Relaxed);

    debug!(tiles = size, failed, "Tile batch flushed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTileStore;

    fn tile(x: u32) -> TileIndex {
        TileIndex::new(10, x, 380)
    }

    fn blob() -> Bytes {
        Bytes::from_static(b"tile")
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_batch_flushes_without_waiting() {
        let store = Arc::new(MockTileStore::new());
        let queue = BatchWriteQueue::new(store.clone(), BatchConfig::default());

        for x in 0..10 {
            queue.enqueue(tile(x), blob());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.len(), 10);
        assert_eq!(queue.stats().batches_flushed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_tile_flushes_after_debounce() {
        let store = Arc::new(MockTileStore::new());
        let queue = BatchWriteQueue::new(store.clone(), BatchConfig::default());

        queue.enqueue(tile(0), blob());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(store.len(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(store.len(), 1);
        assert!(store.has(tile(0)));
        assert_eq!(queue.stats().batches_flushed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_restarts_debounce() {
        let store = Arc::new(MockTileStore::new());
        let queue = BatchWriteQueue::new(store.clone(), BatchConfig::default());

        queue.enqueue(tile(0), blob());
        tokio::time::sleep(Duration::from_millis(600)).await;
        queue.enqueue(tile(1), blob());
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(store.len(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.len(), 2);
        assert_eq!(queue.stats().batches_flushed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_does_not_block_batch() {
        let store = Arc::new(MockTileStore::failing_writes([tile(3)]));
        let queue = BatchWriteQueue::new(store.clone(), BatchConfig::default());

        for x in 0..10 {
            queue.enqueue(tile(x), blob());
        }
        queue.flush().await;

        let stats = queue.stats();
        assert_eq!(stats.tiles_written, 9);
        assert_eq!(stats.write_failures, 1);
        assert_eq!(store.len(), 9);
        assert!(!store.has(tile(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_flush() {
        let store = Arc::new(MockTileStore::new());
        let queue = BatchWriteQueue::new(store.clone(), BatchConfig::default());

        queue.enqueue(tile(0), blob());
        queue.enqueue(tile(1), blob());
        queue.enqueue(tile(2), blob());
        queue.flush().await;

        assert_eq!(store.len(), 3);
        assert_eq!(queue.stats().enqueued, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending() {
        let store = Arc::new(MockTileStore::new());
        let queue = BatchWriteQueue::new(store.clone(), BatchConfig::default());

        queue.enqueue(tile(0), blob());
        queue.enqueue(tile(1), blob());
        queue.shutdown().await;

        assert_eq!(store.len(), 2);

        queue.enqueue(tile(2), blob());
        assert_eq!(queue.stats().enqueued, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_batch_size() {
        let store = Arc::new(MockTileStore::new());
        let config = BatchConfig::default().with_batch_size(3);
        let queue = BatchWriteQueue::new(store.clone(), config);

        for x in 0..7 {
            queue.enqueue(tile(x), blob());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.len(), 6);
        assert_eq!(queue.stats().batches_flushed, 2);
    }

    #[test]
    fn test_config_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.debounce, Duration::from_secs(1));
        assert_eq!(config.with_batch_size(0).batch_size, 1);
    }
}
