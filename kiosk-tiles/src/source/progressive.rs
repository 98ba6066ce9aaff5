//! Progressive prefetch of the visible map area.
//!
//! When the viewport stops moving, the visible box is downloaded at the
//! current zoom and `zoom_buffer` levels either side. Settle events are
//! debounced: each one restarts the timer and only the last viewport of a
//! burst is fetched. Started jobs run to completion in the background.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coord::{CoordError, GeoBoundingBox, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON};
use crate::orchestrator::{DownloadOrchestrator, RegionSpec};

/// Progressive prefetch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressiveConfig {
    pub enabled: bool,
    /// Quiet period after the last settle event.
    pub debounce: Duration,
    /// Zoom levels fetched above and below the current one.
    pub zoom_buffer: u8,
    pub max_concurrent: usize,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce: Duration::from_secs(1),
            zoom_buffer: 1,
            max_concurrent: 2,
        }
    }
}

impl ProgressiveConfig {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Region for a viewport: the box clamped to the Mercator world, at
/// `zoom ± zoom_buffer` bounded to `0..=MAX_ZOOM`.
pub fn viewport_region(
    bbox: &GeoBoundingBox,
    zoom: u8,
    config: &ProgressiveConfig,
) -> Result<RegionSpec, CoordError> {
    let clamped = GeoBoundingBox::new(
        clamp_finite(bbox.north, MIN_LAT, MAX_LAT),
        clamp_finite(bbox.south, MIN_LAT, MAX_LAT),
        clamp_finite(bbox.east, MIN_LON, MAX_LON),
        clamp_finite(bbox.west, MIN_LON, MAX_LON),
    )?;

    let zoom = zoom.min(MAX_ZOOM);
    let min_zoom = zoom.saturating_sub(config.zoom_buffer);
    let max_zoom = zoom.saturating_add(config.zoom_buffer).min(MAX_ZOOM);

    Ok(
        RegionSpec::new("viewport", vec![clamped], (min_zoom..=max_zoom).collect())
            .with_max_concurrent(config.max_concurrent),
    )
}

/// NaN passes through so validation rejects it.
fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(min, max)
    }
}

pub(crate) struct ProgressivePrefetcher {
    orchestrator: DownloadOrchestrator,
    config: ProgressiveConfig,
    enabled: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
    last_job: Arc<Mutex<Option<JoinHandle<()>>>>,
    jobs_started: Arc<AtomicU64>,
}

impl ProgressivePrefetcher {
    pub(crate) fn new(orchestrator: DownloadOrchestrator, config: ProgressiveConfig) -> Self {
        Self {
            orchestrator,
            config,
            enabled: AtomicBool::new(config.enabled),
            timer: Mutex::new(None),
            last_job: Arc::new(Mutex::new(None)),
            jobs_started: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            if let Some(timer) = self.timer.lock().take() {
                timer.abort();
            }
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn jobs_started(&self) -> u64 {
        self.jobs_started.load(Ordering::Relaxed)
    }

    pub(crate) fn on_viewport_settled(&self, bbox: &GeoBoundingBox, zoom: u8) {
        if !self.is_enabled() {
            return;
        }

        let region = match viewport_region(bbox, zoom, &self.config) {
            Ok(region) => region,
            Err(e) => {
                warn!(error = %e, "Ignoring unusable viewport for prefetch");
                return;
            }
        };

        let orchestrator = self.orchestrator.clone();
        let debounce = self.config.debounce;
        let last_job = Arc::clone(&self.last_job);
        let jobs_started = Arc::clone(&self.jobs_started);

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            jobs_started.fetch_add(1, Ordering::Relaxed);
            info!(zoom, zooms = ?region.zoom_levels, "Starting progressive prefetch");

            let job = tokio::spawn(async move {
                match orchestrator.run(&region).await {
                    Ok(stats) => debug!(
                        downloaded = stats.downloaded(),
                        cached = stats.cached(),
                        failed = stats.failed(),
                        "Progressive prefetch finished"
                    ),
                    Err(e) => warn!(error = %e, "Progressive prefetch rejected region"),
                }
            });
            *last_job.lock() = Some(job);
        }));
    }

    /// Wait for a pending timer and the most recent job.
    pub(crate) async fn wait_idle(&self) {
        let timer = self.timer.lock().take();
        if let Some(timer) = timer {
            let _ = timer.await;
        }
        let job = self.last_job.lock().take();
        if let Some(job) = job {
            let _ = job.await;
        }
    }
}
