//! Live tile read path for the map view.
//!
//! Every painted tile goes through [`CacheAsideTileSource::resolve`]:
//!
//! ```text
//! memory tier ──hit──► return (Memory)
//!     │ miss
//! storage ─────hit──► remember in memory, return (Storage)
//!     │ miss or read error
//! network ─────ok───► remember in memory, enqueue for storage, return (Network)
//!     └───────err───► propagate (caller draws a placeholder)
//! ```
//!
//! Storage writes go through the [`BatchWriteQueue`] so painting never waits
//! on disk.

mod progressive;

pub use progressive::{viewport_region, ProgressiveConfig};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::cache::{BatchWriteQueue, MemoryTileCache, TileStore};
use crate::coord::{GeoBoundingBox, TileIndex};
use crate::orchestrator::DownloadOrchestrator;
use crate::provider::{FetchError, TileFetcher};
use progressive::ProgressivePrefetcher;

/// Where a resolved tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileOrigin {
    Memory,
    Storage,
    Network,
}

/// Renderable tile bytes plus their origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTile {
    pub blob: Bytes,
    pub origin: TileOrigin,
}

impl ResolvedTile {
    /// Served without a network request.
    pub fn is_cached(&self) -> bool {
        self.origin != TileOrigin::Network
    }
}

/// Counters for the read path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub memory_hits: u64,
    pub storage_hits: u64,
    pub network_fetches: u64,
    pub network_failures: u64,
    pub prefetch_jobs: u64,
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    storage_hits: AtomicU64,
    network_fetches: AtomicU64,
    network_failures: AtomicU64,
}

/// Cache-aside tile resolver with optional progressive prefetch.
pub struct CacheAsideTileSource {
    memory: Arc<MemoryTileCache>,
    store: Arc<dyn TileStore>,
    fetcher: Arc<dyn TileFetcher>,
    writes: Arc<BatchWriteQueue>,
    prefetcher: ProgressivePrefetcher,
    counters: Counters,
}

impl CacheAsideTileSource {
    pub fn new(
        store: Arc<dyn TileStore>,
        fetcher: Arc<dyn TileFetcher>,
        memory: Arc<MemoryTileCache>,
        writes: Arc<BatchWriteQueue>,
        progressive: ProgressiveConfig,
    ) -> Self {
        let orchestrator = DownloadOrchestrator::new(Arc::clone(&store), Arc::clone(&fetcher));
        Self {
            memory,
            store,
            fetcher,
            writes,
            prefetcher: ProgressivePrefetcher::new(orchestrator, progressive),
            counters: Counters::default(),
        }
    }

    /// Resolve one tile for rendering.
    ///
    /// # Errors
    ///
    /// Only a failed network fetch on a full miss is returned; storage
    /// errors degrade to a miss.
    pub async fn resolve(&self, tile: TileIndex) -> Result<ResolvedTile, FetchError> {
        if let Some(blob) = self.memory.get(&tile).await {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(ResolvedTile {
                blob,
                origin: TileOrigin::Memory,
            });
        }

        match self.store.get_tile(tile).await {
            Ok(Some(blob)) => {
                self.counters.storage_hits.fetch_add(1, Ordering::Relaxed);
                self.memory.insert(tile, blob.clone()).await;
                return Ok(ResolvedTile {
                    blob,
                    origin: TileOrigin::Storage,
                });
            }
            Ok(None) => {}
            Err(e) => debug!(tile = %tile, error = %e, "Storage read failed, fetching from network"),
        }

        let blob = match self.fetcher.fetch(tile).await {
            Ok(blob) => blob,
            Err(e) => {
                self.counters.network_failures.fetch_add(1, Ordering::Relaxed);
                debug!(tile = %tile, error = %e, "Live tile fetch failed");
                return Err(e);
            }
        };

        self.counters.network_fetches.fetch_add(1, Ordering::Relaxed);
        self.memory.insert(tile, blob.clone()).await;
        self.writes.enqueue(tile, blob.clone());

        Ok(ResolvedTile {
            blob,
            origin: TileOrigin::Network,
        })
    }

    /// Turn progressive prefetch on or off. Turning it off drops a pending
    /// (not yet started) prefetch.
    pub fn set_progressive(&self, enabled: bool) {
        self.prefetcher.set_enabled(enabled);
    }

    pub fn progressive_enabled(&self) -> bool {
        self.prefetcher.is_enabled()
    }

    /// Viewport stopped moving. Schedules a debounced prefetch of the
    /// visible area when progressive mode is on.
    pub fn on_viewport_settled(&self, bbox: &GeoBoundingBox, zoom: u8) {
        self.prefetcher.on_viewport_settled(bbox, zoom);
    }

    /// Wait until any scheduled or running prefetch has finished.
    pub async fn wait_for_prefetch(&self) {
        self.prefetcher.wait_idle().await;
    }

    pub fn memory(&self) -> &MemoryTileCache {
        &self.memory
    }

    pub fn writes(&self) -> &BatchWriteQueue {
        &self.writes
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            storage_hits: self.counters.storage_hits.load(Ordering::Relaxed),
            network_fetches: self.counters.network_fetches.load(Ordering::Relaxed),
            network_failures: self.counters.network_failures.load(Ordering::Relaxed),
            prefetch_jobs: self.prefetcher.jobs_started(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BatchConfig;
    use crate::testing::{MockTileFetcher, MockTileStore, PNG_BYTES};
    use std::time::Duration;

    struct Fixture {
        store: Arc<MockTileStore>,
        fetcher: Arc<MockTileFetcher>,
        source: CacheAsideTileSource,
    }

    fn fixture(store: MockTileStore, fetcher: MockTileFetcher, progressive: bool) -> Fixture {
        let store = Arc::new(store);
        let fetcher = Arc::new(fetcher);
        let writes = Arc::new(BatchWriteQueue::new(store.clone(), BatchConfig::default()));
        let source = CacheAsideTileSource::new(
            store.clone(),
            fetcher.clone(),
            Arc::new(MemoryTileCache::new(100)),
            writes,
            ProgressiveConfig::default().enabled(progressive),
        );
        Fixture {
            store,
            fetcher,
            source,
        }
    }

    fn tile() -> TileIndex {
        TileIndex::new(14, 4202, 6091)
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_fetches_then_caches() {
        let f = fixture(MockTileStore::new(), MockTileFetcher::new(), false);

        let first = f.source.resolve(tile()).await.unwrap();
        assert_eq!(first.origin, TileOrigin::Network);
        assert_eq!(first.blob.as_ref(), PNG_BYTES);
        assert!(!first.is_cached());

        let second = f.source.resolve(tile()).await.unwrap();
        assert_eq!(second.origin, TileOrigin::Memory);
        assert_eq!(f.fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_tile_is_persisted_via_batch() {
        let f = fixture(MockTileStore::new(), MockTileFetcher::new(), false);

        f.source.resolve(tile()).await.unwrap();
        assert!(!f.store.has(tile()));

        f.source.writes().flush().await;
        assert!(f.store.has(tile()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_hit_skips_network() {
        let store = MockTileStore::new();
        store.insert(tile(), Bytes::from_static(b"stored"));
        let f = fixture(store, MockTileFetcher::new(), false);

        let resolved = f.source.resolve(tile()).await.unwrap();

        assert_eq!(resolved.origin, TileOrigin::Storage);
        assert_eq!(resolved.blob, Bytes::from_static(b"stored"));
        assert_eq!(f.fetcher.calls(), 0);
        assert_eq!(f.source.stats().storage_hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_error_degrades_to_miss() {
        let f = fixture(MockTileStore::failing_reads(), MockTileFetcher::new(), false);

        let resolved = f.source.resolve(tile()).await.unwrap();

        assert_eq!(resolved.origin, TileOrigin::Network);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_propagates() {
        let f = fixture(MockTileStore::new(), MockTileFetcher::failing([tile()]), false);

        let err = f.source.resolve(tile()).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(f.source.stats().network_failures, 1);
        f.source.writes().flush().await;
        assert_eq!(f.store.len(), 0);
    }

    fn viewport() -> GeoBoundingBox {
        GeoBoundingBox::new(41.95, 41.70, -87.80, -87.95).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_progressive_disabled_does_nothing() {
        let f = fixture(MockTileStore::new(), MockTileFetcher::new(), false);

        f.source.on_viewport_settled(&viewport(), 10);
        f.source.wait_for_prefetch().await;

        assert_eq!(f.fetcher.calls(), 0);
        assert_eq!(f.source.stats().prefetch_jobs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progressive_debounces_and_downloads_visible_area() {
        let f = fixture(MockTileStore::new(), MockTileFetcher::new(), true);
        let expected = viewport_region(&viewport(), 10, &ProgressiveConfig::default())
            .unwrap()
            .expand()
            .unwrap();

        f.source.on_viewport_settled(&viewport(), 6);
        tokio::time::sleep(Duration::from_millis(500)).await;
        f.source.on_viewport_settled(&viewport(), 10);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(f.fetcher.calls(), 0);

        f.source.wait_for_prefetch().await;

        assert_eq!(f.source.stats().prefetch_jobs, 1);
        assert_eq!(f.store.len(), expected.len());
        assert!(expected.iter().all(|t| f.store.has(*t)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_progressive_cancels_pending_prefetch() {
        let f = fixture(MockTileStore::new(), MockTileFetcher::new(), true);

        f.source.on_viewport_settled(&viewport(), 10);
        f.source.set_progressive(false);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!f.source.progressive_enabled());
        assert_eq!(f.fetcher.calls(), 0);
    }
}
