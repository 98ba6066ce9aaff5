//! Application bootstrap implementation.
//!
//! `TileCacheApp` wires the storage backend, network fetcher, memory tier,
//! batch writer, read path and download engine together in one explicitly
//! constructed service object. Front ends hold one instance; tests build as
//! many independent instances as they need.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::{
    open_store, BatchStats, BatchWriteQueue, CacheStats, MemoryStats, MemoryTileCache,
    StorageKind, TileStore,
};
use crate::coord::TileIndex;
use crate::orchestrator::{
    CompletionEstimate, CompletionEstimator, DownloadEvent, DownloadOrchestrator, DownloadStats,
    RegionKind, RegionSpec,
};
use crate::provider::{FetchError, NetworkTileFetcher, ReqwestClient, TileFetcher, UrlTemplate};
use crate::source::{CacheAsideTileSource, ResolvedTile, SourceStats};

/// A download running in the background.
///
/// Drain [`next_event`](Self::next_event) for progress, then
/// [`wait`](Self::wait) for the final stats. Dropping the handle does not
/// stop the job.
pub struct DownloadHandle {
    region: String,
    total: usize,
    events: mpsc::UnboundedReceiver<DownloadEvent>,
    join: JoinHandle<DownloadStats>,
}

impl DownloadHandle {
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Number of tiles in the job.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next progress or completion event; `None` once the job has ended
    /// and every event was consumed.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> Result<DownloadStats, AppError> {
        Ok(self.join.await?)
    }
}

/// Completion estimate for one canonical region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionReport {
    pub region: RegionKind,
    pub estimate: CompletionEstimate,
}

/// Everything the status display shows.
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub storage: CacheStats,
    pub memory: MemoryStats,
    pub writes: BatchStats,
    pub reads: SourceStats,
    pub regions: Vec<RegionReport>,
}

/// Offline tile cache service.
pub struct TileCacheApp {
    config: AppConfig,
    store: Arc<dyn TileStore>,
    memory: Arc<MemoryTileCache>,
    writes: Arc<BatchWriteQueue>,
    source: Arc<CacheAsideTileSource>,
    orchestrator: DownloadOrchestrator,
    estimator: CompletionEstimator,
}

impl TileCacheApp {
    /// Open the configured backend and build the network fetcher.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be opened, the URL template is invalid
    /// or the HTTP client cannot be built.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        info!(backend = %config.backend.kind(), "Starting tile cache");

        let store = open_store(&config.backend)?;
        let fetcher = Self::create_fetcher(&config)?;

        Ok(Self::with_components(config, store, fetcher))
    }

    /// Assemble the app around an existing store and fetcher.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn TileStore>,
        fetcher: Arc<dyn TileFetcher>,
    ) -> Self {
        let memory = Arc::new(MemoryTileCache::new(config.memory_tiles));
        let writes = Arc::new(BatchWriteQueue::new(Arc::clone(&store), config.batch));
        let source = Arc::new(CacheAsideTileSource::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            Arc::clone(&memory),
            Arc::clone(&writes),
            config.progressive,
        ));
        let orchestrator = DownloadOrchestrator::new(Arc::clone(&store), fetcher);
        let estimator = CompletionEstimator::new(Arc::clone(&store));

        info!(
            memory_tiles = config.memory_tiles,
            batch_size = config.batch.batch_size,
            progressive = config.progressive.enabled,
            "Tile cache ready"
        );

        Self {
            config,
            store,
            memory,
            writes,
            source,
            orchestrator,
            estimator,
        }
    }

    fn create_fetcher(config: &AppConfig) -> Result<Arc<dyn TileFetcher>, FetchError> {
        let network = &config.network;
        let client = ReqwestClient::new(&network.user_agent, network.timeout)?;
        let template = UrlTemplate::new(network.url_template.clone(), network.subdomains.clone())?;
        Ok(Arc::new(NetworkTileFetcher::new(client, template)))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.config.backend.kind()
    }

    /// Canonical region spec tuned for the active backend.
    pub fn region(&self, kind: RegionKind) -> RegionSpec {
        kind.spec(self.storage_kind())
    }

    /// Start a canonical download in the background.
    pub fn start_download(&self, kind: RegionKind) -> Result<DownloadHandle, AppError> {
        self.start_region(self.region(kind))
    }

    /// Start a download of an arbitrary region in the background.
    ///
    /// The region is expanded up front so a malformed region fails here
    /// rather than inside the task.
    pub fn start_region(&self, region: RegionSpec) -> Result<DownloadHandle, AppError> {
        let tiles = region.expand()?;
        let (tx, events) = mpsc::unbounded_channel();
        let orchestrator = self.orchestrator.clone();
        let name = region.name.clone();
        let total = tiles.len();

        let join =
            tokio::spawn(async move { orchestrator.run_tiles(&region, &tiles, Some(&tx)).await });

        Ok(DownloadHandle {
            region: name,
            total,
            events,
            join,
        })
    }

    /// Run a canonical download to completion.
    pub async fn download(&self, kind: RegionKind) -> Result<DownloadStats, AppError> {
        Ok(self.orchestrator.run(&self.region(kind)).await?)
    }

    pub async fn completion(&self, kind: RegionKind) -> Result<CompletionEstimate, AppError> {
        Ok(self.estimator.estimate(&self.region(kind)).await?)
    }

    /// Start a download only if the region does not already look complete.
    ///
    /// Intended for startup: returns `None` when nothing needs fetching.
    pub async fn ensure_region(&self, kind: RegionKind) -> Result<Option<DownloadHandle>, AppError> {
        let estimate = self.completion(kind).await?;
        if estimate.is_complete {
            info!(
                region = %kind,
                percent = estimate.percent_cached,
                "Region already cached, skipping download"
            );
            return Ok(None);
        }

        info!(
            region = %kind,
            percent = estimate.percent_cached,
            "Region incomplete, starting download"
        );
        self.start_download(kind).map(Some)
    }

    /// Resolve one tile for the map view.
    pub async fn resolve_tile(&self, tile: TileIndex) -> Result<ResolvedTile, FetchError> {
        self.source.resolve(tile).await
    }

    /// Shared read path, for handing to a renderer.
    pub fn tile_source(&self) -> Arc<CacheAsideTileSource> {
        Arc::clone(&self.source)
    }

    /// Backend statistics (cheap; filesystem counts are unavailable).
    pub async fn stats(&self) -> Result<CacheStats, AppError> {
        Ok(self.store.stats().await?)
    }

    /// Backend statistics, walking the tile tree on the filesystem backend.
    pub async fn scan_stats(&self) -> Result<CacheStats, AppError> {
        Ok(self.store.scan_stats().await?)
    }

    /// Stats plus a completion estimate per canonical region.
    pub async fn report(&self) -> Result<CacheReport, AppError> {
        let mut regions = Vec::with_capacity(RegionKind::ALL.len());
        for kind in RegionKind::ALL {
            regions.push(RegionReport {
                region: kind,
                estimate: self.completion(kind).await?,
            });
        }

        Ok(CacheReport {
            storage: self.stats().await?,
            memory: self.memory.stats(),
            writes: self.writes.stats(),
            reads: self.source.stats(),
            regions,
        })
    }

    /// Remove every stored tile, including the memory tier.
    ///
    /// Pending render-path writes are flushed first so they cannot land
    /// after the clear.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        self.writes.flush().await;
        self.store.clear_all().await?;
        self.memory.clear();
        info!(backend = %self.storage_kind(), "Tile cache cleared");
        Ok(())
    }

    /// Stop prefetching and flush pending writes.
    pub async fn shutdown(self) {
        self.source.set_progressive(false);
        self.writes.shutdown().await;
        info!("Tile cache shut down");
    }
}
