//! Download job results and progress events.

use std::time::Duration;

use serde::Serialize;

/// Running counters for one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadCounts {
    /// Tiles already in storage, skipped without a request.
    pub cached: usize,
    /// Tiles fetched and stored by this run.
    pub downloaded: usize,
    /// Tiles whose fetch or write failed.
    pub failed: usize,
}

impl DownloadCounts {
    pub fn settled(&self) -> usize {
        self.cached + self.downloaded + self.failed
    }
}

/// How a single tile settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    Cached,
    Downloaded,
    /// `requested` is false when the tile never reached the network.
    Failed { requested: bool },
}

impl TileOutcome {
    /// Whether settling this tile involved a network request.
    pub fn hit_network(&self) -> bool {
        match self {
            TileOutcome::Cached => false,
            TileOutcome::Downloaded => true,
            TileOutcome::Failed { requested } => *requested,
        }
    }
}

/// Final summary of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub region: String,
    pub total: usize,
    pub completed: usize,
    #[serde(flatten)]
    pub counts: DownloadCounts,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl DownloadStats {
    pub fn cached(&self) -> usize {
        self.counts.cached
    }

    pub fn downloaded(&self) -> usize {
        self.counts.downloaded
    }

    pub fn failed(&self) -> usize {
        self.counts.failed
    }

    /// Every tile is now stored.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total && self.counts.failed == 0
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Event stream of a running job.
///
/// One `Progress` per settled tile, then exactly one `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Progress {
        completed: usize,
        total: usize,
        counts: DownloadCounts,
    },
    Completed(DownloadStats),
}
