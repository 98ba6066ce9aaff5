//! Embedded key-value tile store backed by SQLite.
//!
//! Used when the kiosk runs without an app-private directory tree: every
//! tile is a row in a single `tiles` table keyed by `"z/x/y"`.
//!
//! # Blocking I/O
//!
//! `rusqlite` is synchronous. Each operation takes the connection lock
//! inside `spawn_blocking`, so the async runtime never blocks on SQLite.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::cache::stats::{CacheStats, StorageKind};
use crate::cache::traits::{BoxFuture, StoreError, TileStore};
use crate::coord::TileIndex;

const SCHEMA: &str = "
    PRAGMA synchronous = NORMAL;
    PRAGMA temp_store = MEMORY;
    CREATE TABLE IF NOT EXISTS tiles (
        key TEXT PRIMARY KEY,
        z INTEGER NOT NULL,
        x INTEGER NOT NULL,
        y INTEGER NOT NULL,
        blob BLOB NOT NULL,
        stored_at INTEGER NOT NULL
    );
";

/// SQLite-backed tile store.
pub struct KeyValueTileStore {
    conn: Arc<Mutex<Connection>>,
    /// Database file, `None` for in-memory stores.
    path: Option<PathBuf>,
}

impl KeyValueTileStore {
    /// Open (or create) a store at `path`.
    ///
    /// Creates the parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %path.display(), "Key-value tile store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a store that lives only in memory.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file backing this store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await?;
        Ok(result?)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl TileStore for KeyValueTileStore {
    fn save_tile(&self, tile: TileIndex, blob: Bytes) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO tiles (key, z, x, y, blob, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![tile.key(), tile.z, tile.x, tile.y, blob.as_ref(), unix_now()],
                )
                .map(|_| ())
            })
            .await
        })
    }

    fn get_tile(&self, tile: TileIndex) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>> {
        Box::pin(async move {
            let blob = self
                .with_conn(move |conn| {
                    conn.query_row(
                        "SELECT blob FROM tiles WHERE key = ?1",
                        [tile.key()],
                        |row| row.get::<_, Vec<u8>>(0),
                    )
                    .optional()
                })
                .await?;
            Ok(blob.map(Bytes::from))
        })
    }

    fn contains(&self, tile: TileIndex) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.query_row("SELECT 1 FROM tiles WHERE key = ?1", [tile.key()], |_| {
                    Ok(())
                })
                .optional()
                .map(|found| found.is_some())
            })
            .await
        })
    }

    fn clear_all(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let removed = self
                .with_conn(|conn| conn.execute("DELETE FROM tiles", []))
                .await?;
            info!(removed, "Key-value tile store cleared");
            Ok(())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        Box::pin(async move {
            let (count, bytes) = self
                .with_conn(|conn| {
                    conn.query_row(
                        "SELECT COUNT(*), COALESCE(SUM(LENGTH(blob)), 0) FROM tiles",
                        [],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                    )
                })
                .await?;

            Ok(CacheStats {
                storage: StorageKind::KeyValue,
                tile_count: Some(count.max(0) as u64),
                size_bytes: Some(bytes.max(0) as u64),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_kv_save_and_get_roundtrip() {
        let store = KeyValueTileStore::open_in_memory().unwrap();
        let tile = TileIndex::new(12, 1047, 1520);
        let blob = Bytes::from_static(b"\x89PNG fake tile");

        store.save_tile(tile, blob.clone()).await.unwrap();

        assert_eq!(store.get_tile(tile).await.unwrap(), Some(blob));
    }

    #[tokio::test]
    async fn test_kv_get_missing_is_none() {
        let store = KeyValueTileStore::open_in_memory().unwrap();
        let result = store.get_tile(TileIndex::new(3, 1, 1)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_kv_save_is_idempotent() {
        let store = KeyValueTileStore::open_in_memory().unwrap();
        let tile = TileIndex::new(5, 3, 4);

        store.save_tile(tile, Bytes::from_static(b"abc")).await.unwrap();
        store.save_tile(tile, Bytes::from_static(b"abc")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.tile_count, Some(1));
        assert_eq!(stats.size_bytes, Some(3));
    }

    #[tokio::test]
    async fn test_kv_contains() {
        let store = KeyValueTileStore::open_in_memory().unwrap();
        let tile = TileIndex::new(10, 261, 380);

        assert!(!store.contains(tile).await.unwrap());
        store.save_tile(tile, Bytes::from_static(b"x")).await.unwrap();
        assert!(store.contains(tile).await.unwrap());
    }

    #[tokio::test]
    async fn test_kv_clear_all() {
        let store = KeyValueTileStore::open_in_memory().unwrap();
        for x in 0..4 {
            store
                .save_tile(TileIndex::new(2, x, 0), Bytes::from_static(b"t"))
                .await
                .unwrap();
        }

        store.clear_all().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.tile_count, Some(0));
        assert_eq!(stats.storage, StorageKind::KeyValue);
    }

    #[tokio::test]
    async fn test_kv_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tiles.db");
        let tile = TileIndex::new(4, 2, 9);

        {
            let store = KeyValueTileStore::open(&path).unwrap();
            store.save_tile(tile, Bytes::from_static(b"persist")).await.unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }

        let reopened = KeyValueTileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_tile(tile).await.unwrap(),
            Some(Bytes::from_static(b"persist"))
        );
    }
}
