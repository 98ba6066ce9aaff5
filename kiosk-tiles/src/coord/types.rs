//! Coordinate type definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels served by the tile endpoint
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// Errors raised when a region cannot be expanded into tiles.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is NaN or outside the Web Mercator range.
    #[error("Invalid latitude: {0} (expected -85.05112878..=85.05112878)")]
    InvalidLatitude(f64),

    /// Longitude is NaN or outside -180..=180.
    #[error("Invalid longitude: {0} (expected -180..=180)")]
    InvalidLongitude(f64),

    /// Zoom level above the supported maximum.
    #[error("Invalid zoom level: {0} (max 18)")]
    InvalidZoom(u8),

    /// North edge is not strictly above the south edge.
    #[error("Inverted bounding box: north {north} is not above south {south}")]
    InvertedLatitude { north: f64, south: f64 },

    /// West edge lies east of the east edge (antimeridian boxes must be split).
    #[error("Inverted bounding box: west {west} is east of east {east}")]
    InvertedLongitude { west: f64, east: f64 },

    /// A region was given no zoom levels to expand at.
    #[error("Region has no zoom levels")]
    NoZoomLevels,
}

/// Identity of one slippy-map tile.
///
/// `x` and `y` are in `[0, 2^z)`; `y` grows southwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    /// Zoom level
    pub z: u8,
    /// Column (west → east)
    pub x: u32,
    /// Row (north → south)
    pub y: u32,
}

impl TileIndex {
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Cache key in `z/x/y` form.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Whether `x` and `y` fall inside the grid for this zoom.
    pub fn is_valid(&self) -> bool {
        if self.z > MAX_ZOOM {
            return false;
        }
        let n = 1u32 << self.z;
        self.x < n && self.y < n
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Geographic bounding box in degrees.
///
/// Construct through [`GeoBoundingBox::new`] to get validation; the
/// `const` constructor is for compiled-in regions known to be sane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBoundingBox {
    /// Create a validated bounding box.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, CoordError> {
        let bbox = Self {
            north,
            south,
            east,
            west,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Create a bounding box without validation.
    pub const fn from_edges(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Check the box is usable for tile expansion.
    ///
    /// Latitudes must lie in the Mercator range, longitudes in -180..=180,
    /// `north > south` and `west <= east`.
    pub fn validate(&self) -> Result<(), CoordError> {
        for lat in [self.north, self.south] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [self.east, self.west] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if self.north <= self.south {
            return Err(CoordError::InvertedLatitude {
                north: self.north,
                south: self.south,
            });
        }
        if self.west > self.east {
            return Err(CoordError::InvertedLongitude {
                west: self.west,
                east: self.east,
            });
        }
        Ok(())
    }
}
