//! Download regions.
//!
//! A [`RegionSpec`] names one or more bounding boxes and the zoom levels to
//! expand them at, together with the concurrency and pacing the
//! orchestrator should use. The three canonical regions are compiled in.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::StorageKind;
use crate::coord::{self, CoordError, GeoBoundingBox, TileIndex};

/// Pause between windows that touched the network.
pub const DEFAULT_WINDOW_DELAY: Duration = Duration::from_millis(50);

/// Longer pause for the metro job, which hits many small regions.
pub const METRO_WINDOW_DELAY: Duration = Duration::from_millis(100);

/// Dense local region around the kiosk.
pub const PRIMARY_BOUNDS: GeoBoundingBox =
    GeoBoundingBox::from_edges(42.0231, 41.6445, -87.5237, -87.9401);

/// Whole Web Mercator world.
pub const GLOBAL_BOUNDS: GeoBoundingBox = GeoBoundingBox::from_edges(85.0, -85.0, 180.0, -180.0);

pub const PRIMARY_ZOOMS: [u8; 8] = [10, 11, 12, 13, 14, 15, 16, 17];
pub const METRO_ZOOMS: [u8; 3] = [10, 11, 12];
pub const GLOBAL_ZOOMS: [u8; 3] = [3, 4, 5];

/// Half-width in degrees of each metro box.
const METRO_RADIUS_DEG: f64 = 0.25;

/// Curated metros as `(name, latitude, longitude)` of the city centre.
pub const METRO_AREAS: [(&str, f64, f64); 20] = [
    ("New York", 40.7128, -74.0060),
    ("Los Angeles", 34.0522, -118.2437),
    ("San Francisco", 37.7749, -122.4194),
    ("Toronto", 43.6532, -79.3832),
    ("Mexico City", 19.4326, -99.1332),
    ("Sao Paulo", -23.5505, -46.6333),
    ("Buenos Aires", -34.6037, -58.3816),
    ("London", 51.5074, -0.1278),
    ("Paris", 48.8566, 2.3522),
    ("Berlin", 52.5200, 13.4050),
    ("Madrid", 40.4168, -3.7038),
    ("Rome", 41.9028, 12.4964),
    ("Istanbul", 41.0082, 28.9784),
    ("Cairo", 30.0444, 31.2357),
    ("Lagos", 6.5244, 3.3792),
    ("Dubai", 25.2048, 55.2708),
    ("Mumbai", 19.0760, 72.8777),
    ("Singapore", 1.3521, 103.8198),
    ("Tokyo", 35.6762, 139.6503),
    ("Sydney", -33.8688, 151.2093),
];

/// The three canonical download strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Many zoom levels over the kiosk's home area.
    Primary,
    /// Moderate zoom levels over world metros.
    Metro,
    /// Low zoom levels over the whole world.
    Global,
}

impl RegionKind {
    pub const ALL: [RegionKind; 3] = [RegionKind::Primary, RegionKind::Metro, RegionKind::Global];

    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Primary => "primary",
            RegionKind::Metro => "metro",
            RegionKind::Global => "global",
        }
    }

    /// Canonical spec for this kind, tuned for the storage backend in use.
    pub fn spec(&self, storage: StorageKind) -> RegionSpec {
        match self {
            RegionKind::Primary => RegionSpec::primary(storage),
            RegionKind::Metro => RegionSpec::metro(),
            RegionKind::Global => RegionSpec::global(),
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(RegionKind::Primary),
            "metro" => Ok(RegionKind::Metro),
            "global" => Ok(RegionKind::Global),
            other => Err(format!(
                "unknown region '{}' (expected primary, metro or global)",
                other
            )),
        }
    }
}

/// A named set of boxes and zoom levels plus download pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpec {
    pub name: String,
    pub boxes: Vec<GeoBoundingBox>,
    pub zoom_levels: Vec<u8>,
    /// Window size: tiles in flight at once.
    pub max_concurrent: usize,
    /// Pause after a window that made network requests.
    pub window_delay: Duration,
}

impl RegionSpec {
    /// Ad-hoc region with default pacing and concurrency 2.
    pub fn new(name: impl Into<String>, boxes: Vec<GeoBoundingBox>, zoom_levels: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            boxes,
            zoom_levels,
            max_concurrent: 2,
            window_delay: DEFAULT_WINDOW_DELAY,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_window_delay(mut self, window_delay: Duration) -> Self {
        self.window_delay = window_delay;
        self
    }

    /// Dense home region. File storage absorbs more parallel writes than
    /// the embedded database, so it gets a wider window.
    pub fn primary(storage: StorageKind) -> Self {
        let max_concurrent = match storage {
            StorageKind::Filesystem => 4,
            StorageKind::KeyValue => 2,
        };
        Self::new(
            RegionKind::Primary.name(),
            vec![PRIMARY_BOUNDS],
            PRIMARY_ZOOMS.to_vec(),
        )
        .with_max_concurrent(max_concurrent)
    }

    pub fn metro() -> Self {
        let boxes = METRO_AREAS
            .iter()
            .map(|&(_, lat, lon)| metro_box(lat, lon))
            .collect();
        Self::new(RegionKind::Metro.name(), boxes, METRO_ZOOMS.to_vec())
            .with_max_concurrent(3)
            .with_window_delay(METRO_WINDOW_DELAY)
    }

    pub fn global() -> Self {
        Self::new(
            RegionKind::Global.name(),
            vec![GLOBAL_BOUNDS],
            GLOBAL_ZOOMS.to_vec(),
        )
        .with_max_concurrent(4)
    }

    /// Every tile in the region, deduplicated across boxes.
    pub fn expand(&self) -> Result<Vec<TileIndex>, CoordError> {
        coord::expand_all(&self.boxes, &self.zoom_levels)
    }
}

fn metro_box(lat: f64, lon: f64) -> GeoBoundingBox {
    GeoBoundingBox::from_edges(
        lat + METRO_RADIUS_DEG,
        lat - METRO_RADIUS_DEG,
        lon + METRO_RADIUS_DEG,
        lon - METRO_RADIUS_DEG,
    )
}
