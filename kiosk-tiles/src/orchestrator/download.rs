//! Bulk download engine.
//!
//! The tile list is walked in windows of `max_concurrent` tiles. Every tile
//! in a window runs concurrently and the window is awaited in full before
//! the next one starts, so at most `max_concurrent` fetches and writes are
//! ever in flight.
//!
//! Per tile:
//!
//! 1. Already stored → `cached`, no request.
//! 2. Otherwise fetch, write straight to the store → `downloaded`.
//! 3. Any fetch or write failure → `failed`; the job carries on.
//!
//! Windows that touched the network are followed by a short pause so a
//! large uncached span does not hammer the tile server. All-cached windows
//! run back to back.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::region::RegionSpec;
use super::types::{DownloadCounts, DownloadEvent, DownloadStats, TileOutcome};
use crate::cache::TileStore;
use crate::coord::{CoordError, TileIndex};
use crate::provider::TileFetcher;

/// Runs download jobs against one store and one fetcher.
///
/// Cheap to clone; clones share the store and fetcher.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    store: Arc<dyn TileStore>,
    fetcher: Arc<dyn TileFetcher>,
}

impl DownloadOrchestrator {
    pub fn new(store: Arc<dyn TileStore>, fetcher: Arc<dyn TileFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Run a job to completion without progress reporting.
    ///
    /// # Errors
    ///
    /// Only region expansion can fail; per-tile failures are counted.
    pub async fn run(&self, region: &RegionSpec) -> Result<DownloadStats, CoordError> {
        let tiles = region.expand()?;
        Ok(self.run_tiles(region, &tiles, None).await)
    }

    /// Run a job, streaming a [`DownloadEvent`] per settled tile and one
    /// final `Completed` event.
    ///
    /// A dropped receiver does not stop the job.
    pub async fn run_with_events(
        &self,
        region: &RegionSpec,
        events: mpsc::UnboundedSender<DownloadEvent>,
    ) -> Result<DownloadStats, CoordError> {
        let tiles = region.expand()?;
        Ok(self.run_tiles(region, &tiles, Some(&events)).await)
    }

    /// Run a job over an already expanded tile list.
    pub async fn run_tiles(
        &self,
        region: &RegionSpec,
        tiles: &[TileIndex],
        events: Option<&mpsc::UnboundedSender<DownloadEvent>>,
    ) -> DownloadStats {
        let started = Instant::now();
        let total = tiles.len();
        let window_size = region.max_concurrent.max(1);

        info!(
            region = %region.name,
            tiles = total,
            max_concurrent = window_size,
            "Starting region download"
        );

        let mut counts = DownloadCounts::default();
        let mut completed = 0;

        let mut windows = tiles.chunks(window_size).peekable();
        while let Some(window) = windows.next() {
            let mut hit_network = false;
            let mut in_flight: FuturesUnordered<_> =
                window.iter().map(|&tile| self.process_tile(tile)).collect();

            while let Some(outcome) = in_flight.next().await {
                match outcome {
                    TileOutcome::Cached => counts.cached += 1,
                    TileOutcome::Downloaded => counts.downloaded += 1,
                    TileOutcome::Failed { .. } => counts.failed += 1,
                }
                hit_network |= outcome.hit_network();
                completed += 1;

                if let Some(tx) = events {
                    let _ = tx.send(DownloadEvent::Progress {
                        completed,
                        total,
                        counts,
                    });
                }
            }

            if hit_network && !region.window_delay.is_zero() && windows.peek().is_some() {
                tokio::time::sleep(region.window_delay).await;
            }
        }

        let stats = DownloadStats {
            region: region.name.clone(),
            total,
            completed,
            counts,
            elapsed: started.elapsed(),
        };

        info!(
            region = %stats.region,
            total = stats.total,
            cached = stats.counts.cached,
            downloaded = stats.counts.downloaded,
            failed = stats.counts.failed,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Region download complete"
        );

        if let Some(tx) = events {
            let _ = tx.send(DownloadEvent::Completed(stats.clone()));
        }

        stats
    }

    async fn process_tile(&self, tile: TileIndex) -> TileOutcome {
        match self.store.contains(tile).await {
            Ok(true) => return TileOutcome::Cached,
            Ok(false) => {}
            Err(e) => debug!(tile = %tile, error = %e, "Storage check failed, treating as miss"),
        }

        let blob = match self.fetcher.fetch(tile).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(tile = %tile, error = %e, "Tile download failed");
                return TileOutcome::Failed { requested: true };
            }
        };

        match self.store.save_tile(tile, blob).await {
            Ok(()) => TileOutcome::Downloaded,
            Err(e) => {
                warn!(tile = %tile, error = %e, "Failed to store downloaded tile");
                TileOutcome::Failed { requested: true }
            }
        }
    }
}
