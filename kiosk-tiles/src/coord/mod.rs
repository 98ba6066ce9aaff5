//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and slippy-map tile indices, plus expansion of a bounding box into the
//! full set of tiles covering it.

mod types;

pub use types::{
    CoordError, GeoBoundingBox, TileIndex, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::collections::HashSet;
use std::f64::consts::PI;

/// Projects a geographic point to a tile column/row at `zoom`.
///
/// Uses the standard Web Mercator slippy-map formula. Latitude is not
/// clamped; callers pass values inside [`MIN_LAT`]..=[`MAX_LAT`]. The
/// resulting indices are clamped into `[0, 2^zoom)` so that the east edge
/// (`lng == 180`) and the Mercator limits map onto the last tile.
///
/// # Returns
///
/// `(x, y)` tile indices.
#[inline]
pub fn project(lat: f64, lng: f64, zoom: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);

    let x = ((lng + 180.0) / 360.0 * n).floor();

    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    (clamp_index(x, n), clamp_index(y, n))
}

/// Clamp a floored index into `[0, n)`; NaN maps to 0.
#[inline]
fn clamp_index(value: f64, n: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, n - 1.0) as u32
}

/// Converts a tile index back to the latitude/longitude of its northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileIndex) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.z as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Expands a bounding box into every tile it covers at each zoom level.
///
/// Projects the north-west and south-east corners at each zoom and
/// enumerates the inclusive rectangle between them. Zoom levels are
/// processed in the order given; duplicate zoom levels contribute once.
///
/// # Errors
///
/// Returns [`CoordError`] if the box is malformed, `zoom_levels` is empty
/// or a zoom level exceeds [`MAX_ZOOM`].
pub fn expand(bbox: &GeoBoundingBox, zoom_levels: &[u8]) -> Result<Vec<TileIndex>, CoordError> {
    expand_all(std::slice::from_ref(bbox), zoom_levels)
}

/// Expands several bounding boxes and returns the union of their tiles.
///
/// Tiles shared by overlapping boxes appear once, in first-seen order.
pub fn expand_all(
    boxes: &[GeoBoundingBox],
    zoom_levels: &[u8],
) -> Result<Vec<TileIndex>, CoordError> {
    if zoom_levels.is_empty() {
        return Err(CoordError::NoZoomLevels);
    }
    if let Some(&zoom) = zoom_levels.iter().find(|&&z| z > MAX_ZOOM) {
        return Err(CoordError::InvalidZoom(zoom));
    }
    for bbox in boxes {
        bbox.validate()?;
    }

    let mut seen = HashSet::new();
    let mut tiles = Vec::new();

    for bbox in boxes {
        for &zoom in zoom_levels {
            let (min_x, min_y) = project(bbox.north, bbox.west, zoom);
            let (max_x, max_y) = project(bbox.south, bbox.east, zoom);

            for x in min_x..=max_x {
                for y in min_y..=max_y {
                    let tile = TileIndex::new(zoom, x, y);
                    if seen.insert(tile) {
                        tiles.push(tile);
                    }
                }
            }
        }
    }

    Ok(tiles)
}
