//! Cheap "is this region already downloaded?" check.
//!
//! Checking every tile of a dense region means tens of thousands of storage
//! lookups. Instead at most [`MAX_SAMPLES`] evenly strided tiles are checked
//! and the cached share is extrapolated. A region counts as complete at
//! [`COMPLETE_PERCENT`] or above.
//!
//! The answer is a heuristic: a region can read as complete with a few
//! tiles missing, and small regions near the threshold can flip either way.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::region::RegionSpec;
use crate::cache::TileStore;
use crate::coord::{CoordError, TileIndex};

/// Upper bound on storage lookups per estimate.
pub const MAX_SAMPLES: usize = 100;

/// Cached share at which a region is treated as complete.
pub const COMPLETE_PERCENT: f64 = 95.0;

/// Result of sampling a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionEstimate {
    pub total_tiles: usize,
    pub sample_size: usize,
    pub cached_in_sample: usize,
    pub percent_cached: f64,
    pub is_complete: bool,
}

pub struct CompletionEstimator {
    store: Arc<dyn TileStore>,
}

impl CompletionEstimator {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self { store }
    }

    /// Estimate how much of `region` is stored.
    pub async fn estimate(&self, region: &RegionSpec) -> Result<CompletionEstimate, CoordError> {
        let tiles = region.expand()?;
        let estimate = self.estimate_tiles(&tiles).await;
        debug!(
            region = %region.name,
            percent = estimate.percent_cached,
            complete = estimate.is_complete,
            "Region completion estimated"
        );
        Ok(estimate)
    }

    /// Estimate over an expanded tile list.
    ///
    /// An empty list is reported as 0% and incomplete. Storage errors count
    /// as missing tiles.
    pub async fn estimate_tiles(&self, tiles: &[TileIndex]) -> CompletionEstimate {
        let total_tiles = tiles.len();
        let sample = sample_indices(total_tiles);
        let sample_size = sample.len();

        let mut cached_in_sample = 0;
        for i in sample {
            if matches!(self.store.contains(tiles[i]).await, Ok(true)) {
                cached_in_sample += 1;
            }
        }

        let percent_cached = if sample_size == 0 {
            0.0
        } else {
            cached_in_sample as f64 / sample_size as f64 * 100.0
        };

        CompletionEstimate {
            total_tiles,
            sample_size,
            cached_in_sample,
            percent_cached,
            is_complete: sample_size > 0 && percent_cached >= COMPLETE_PERCENT,
        }
    }
}

/// Positions checked for a list of `total` tiles: at most [`MAX_SAMPLES`]
/// entries spread evenly from the first tile to the end of the list.
fn sample_indices(total: usize) -> impl ExactSizeIterator<Item = usize> {
    let size = total.min(MAX_SAMPLES);
    (0..size).map(move |i| i * total / size)
}
