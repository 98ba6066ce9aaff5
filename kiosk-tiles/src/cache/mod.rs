//! Tile storage.
//!
//! Three layers sit between a tile request and the disk:
//!
//! ```text
//! MemoryTileCache (moka, bounded)
//!        ↓ miss
//! Arc<dyn TileStore>  ←  BatchWriteQueue (render-path writes)
//!        ↓
//! KeyValueTileStore | FilesystemTileStore
//! ```
//!
//! The backend is chosen once through [`open_store`] from a
//! [`BackendConfig`]; everything above it is written against [`TileStore`].

pub mod backend;
pub mod batch;
pub mod memory;
pub mod providers;
pub mod stats;
mod traits;

pub use backend::{default_data_dir, open_store, BackendConfig};
pub use batch::{BatchConfig, BatchStats, BatchWriteQueue};
pub use memory::{MemoryStats, MemoryTileCache, DEFAULT_MEMORY_TILES};
pub use providers::{FilesystemTileStore, KeyValueTileStore};
pub use stats::{CacheStats, StorageKind};
pub use traits::{BoxFuture, StoreError, TileStore};
