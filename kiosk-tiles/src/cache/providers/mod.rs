//! Storage backend implementations.
//!
//! Each provider implements [`TileStore`](crate::cache::TileStore). Pick one
//! at startup through [`open_store`](crate::cache::open_store) rather than
//! constructing a provider directly.
//!
//! # Available Providers
//!
//! - [`KeyValueTileStore`]: embedded SQLite table keyed `z/x/y`
//! - [`FilesystemTileStore`]: one file per tile under `map-tiles/z/x/y.png`

mod filesystem;
mod kv;

pub use filesystem::{FilesystemTileStore, TILE_DIR_NAME};
pub use kv::KeyValueTileStore;
