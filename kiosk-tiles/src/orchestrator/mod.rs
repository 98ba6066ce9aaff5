//! Bulk region downloads.
//!
//! - [`RegionSpec`] / [`RegionKind`]: what to download
//! - [`DownloadOrchestrator`]: windowed, bounded-concurrency download engine
//! - [`CompletionEstimator`]: sampling check used to skip finished regions

pub mod completion;
mod download;
mod region;
mod types;

pub use completion::{CompletionEstimate, CompletionEstimator};
pub use download::DownloadOrchestrator;
pub use region::{
    RegionKind, RegionSpec, DEFAULT_WINDOW_DELAY, GLOBAL_BOUNDS, METRO_AREAS, PRIMARY_BOUNDS,
};
pub use types::{DownloadCounts, DownloadEvent, DownloadStats, TileOutcome};
