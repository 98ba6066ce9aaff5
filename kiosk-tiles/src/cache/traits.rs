//! Core traits for tile storage.
//!
//! The `TileStore` trait is the storage contract every backend satisfies.
//! Callers hold an `Arc<dyn TileStore>` and never learn which backend is
//! active; the concrete store is picked once at startup (see
//! [`crate::cache::open_store`]).
//!
//! # Design Principles
//!
//! - **Tile-keyed**: entries are addressed by [`TileIndex`], serialized as
//!   `z/x/y` by each backend
//! - **Immutable blobs**: a tile is written once; re-writing the same key is
//!   allowed and idempotent
//! - **Absent is not an error**: `get_tile` returns `Ok(None)` for an
//!   uncached tile
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use super::stats::CacheStats;
use crate::coord::TileIndex;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error in the filesystem backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the embedded key-value database.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Storage contract for cached map tiles.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Operations on different tiles never conflict, and two writers storing the
/// same tile both succeed, so implementations need no cross-call locking
/// beyond what their own handle requires.
pub trait TileStore: Send + Sync {
    /// Store the blob for a tile, replacing any previous blob.
    fn save_tile(&self, tile: TileIndex, blob: Bytes) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Retrieve the blob for a tile.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(blob))` if the tile is cached
    /// - `Ok(None)` if it is not
    /// - `Err(_)` if the backend failed
    fn get_tile(&self, tile: TileIndex) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>>;

    /// Check whether a tile is cached without reading its blob.
    fn contains(&self, tile: TileIndex) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Remove every stored tile.
    fn clear_all(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Report aggregate statistics.
    ///
    /// Best effort: backends that cannot count cheaply leave fields empty.
    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>>;

    /// Statistics computed exhaustively, however expensive.
    ///
    /// Defaults to [`stats`](Self::stats) for backends whose counts are
    /// already exact.
    fn scan_stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        self.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_store_error_task_display() {
        let err = StoreError::Task("cancelled".to_string());
        assert_eq!(err.to_string(), "Storage task failed: cancelled");
    }
}
