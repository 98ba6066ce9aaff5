//! In-memory tile tier using moka.
//!
//! Sits in front of the storage backend on the render path so that tiles
//! painted repeatedly while panning never touch disk. Bounded by entry
//! count; moka evicts least-recently-used tiles once the bound is reached.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use serde::Serialize;

use crate::coord::TileIndex;

/// Default number of tiles kept in memory.
pub const DEFAULT_MEMORY_TILES: u64 = 500;

/// Snapshot of memory tier counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub entries: u64,
    pub capacity: u64,
    pub hits: u64,
    pub misses: u64,
}

impl MemoryStats {
    /// Fraction of lookups served from memory, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU of recently used tiles.
pub struct MemoryTileCache {
    cache: MokaCache<TileIndex, Bytes>,
    capacity: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryTileCache {
    /// Create a cache holding at most `capacity` tiles.
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(capacity).build(),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, tile: &TileIndex) -> Option<Bytes> {
        let result = self.cache.get(tile).await;
        let counter = if result.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub async fn insert(&self, tile: TileIndex, blob: Bytes) {
        self.cache.insert(tile, blob).await;
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Run pending eviction work so counts are current.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            entries: self.cache.entry_count(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryTileCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_TILES)
    }
}
