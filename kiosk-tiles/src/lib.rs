//! Kiosk Tiles - offline map-tile cache for kiosk map views
//!
//! This library keeps slippy-map raster tiles available without a network
//! connection. It bulk-downloads canonical regions ahead of time, serves
//! tiles to the map view through a memory tier and a persistent store,
//! and falls back to the tile server only on a miss.
//!
//! Most front ends only need [`app::TileCacheApp`]; the lower layers are
//! public for embedding and testing.

pub mod app;
pub mod cache;
pub mod coord;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod source;

#[cfg(test)]
mod testing;

pub use app::{AppConfig, AppError, TileCacheApp};
pub use coord::{GeoBoundingBox, TileIndex};
