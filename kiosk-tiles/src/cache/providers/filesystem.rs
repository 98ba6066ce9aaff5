//! Hierarchical file tile store.
//!
//! Tiles live at `<root>/map-tiles/{z}/{x}/{y}.png`, one file per tile.
//! This is the backend for installed-app deployments where an app-private
//! directory survives updates.
//!
//! Writes go to a uniquely named `.tmp` sibling that is renamed over the
//! final path, so a tile file is either absent or complete. Empty files are
//! treated as missing.
//!
//! Counting tiles means walking the whole tree, so [`TileStore::stats`]
//! leaves the counts empty. [`FilesystemTileStore::scan`] performs the walk
//! on request.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cache::stats::{CacheStats, StorageKind};
use crate::cache::traits::{BoxFuture, StoreError, TileStore};
use crate::coord::TileIndex;

/// Directory under the root that holds the tile tree.
pub const TILE_DIR_NAME: &str = "map-tiles";

const TILE_EXTENSION: &str = "png";

/// Suffix source for in-flight temp files.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File-per-tile store.
pub struct FilesystemTileStore {
    tiles_dir: PathBuf,
}

impl FilesystemTileStore {
    /// Create a store rooted at `root`.
    ///
    /// The tile tree is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let tiles_dir = root.into().join(TILE_DIR_NAME);
        info!(path = %tiles_dir.display(), "Filesystem tile store opened");
        Self { tiles_dir }
    }

    /// Directory holding the `z/x/y.png` tree.
    pub fn tiles_dir(&self) -> &Path {
        &self.tiles_dir
    }

    /// Path of the file for `tile`.
    pub fn tile_path(&self, tile: TileIndex) -> PathBuf {
        self.tiles_dir
            .join(tile.z.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.{}", tile.y, TILE_EXTENSION))
    }

    fn temp_path(&self, tile: TileIndex) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = self.tile_path(tile);
        path.set_extension(format!("{}.{}.{}.tmp", TILE_EXTENSION, std::process::id(), n));
        path
    }

    /// Walk the tile tree and count files and bytes.
    ///
    /// Runs on the blocking pool; cost is proportional to the number of
    /// stored tiles.
    pub async fn scan(&self) -> Result<CacheStats, StoreError> {
        let dir = self.tiles_dir.clone();
        let (count, bytes) = tokio::task::spawn_blocking(move || walk(&dir)).await??;

        Ok(CacheStats {
            storage: StorageKind::Filesystem,
            tile_count: Some(count),
            size_bytes: Some(bytes),
        })
    }
}

fn walk(dir: &Path) -> io::Result<(u64, u64)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, 0)),
        Err(e) => return Err(e),
    };

    let mut count = 0;
    let mut bytes = 0;
    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let (c, b) = walk(&entry.path())?;
            count += c;
            bytes += b;
        } else if file_type.is_file() && is_tile_file(&entry.path()) {
            let len = entry.metadata()?.len();
            if len > 0 {
                count += 1;
                bytes += len;
            }
        }
    }
    Ok((count, bytes))
}

fn is_tile_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TILE_EXTENSION)
}

impl TileStore for FilesystemTileStore {
    fn save_tile(&self, tile: TileIndex, blob: Bytes) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let path = self.tile_path(tile);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let temp = self.temp_path(tile);
            let written = match tokio::fs::write(&temp, &blob).await {
                Ok(()) => tokio::fs::rename(&temp, &path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!(path = %temp.display(), error = %cleanup, "Failed to remove temp tile file");
                    }
                }
                return Err(e.into());
            }
            debug!(tile = %tile, bytes = blob.len(), "Tile written to disk");
            Ok(())
        })
    }

    fn get_tile(&self, tile: TileIndex) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>> {
        Box::pin(async move {
            match tokio::fs::read(self.tile_path(tile)).await {
                Ok(data) if data.is_empty() => Ok(None),
                Ok(data) => Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn contains(&self, tile: TileIndex) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            match tokio::fs::metadata(self.tile_path(tile)).await {
                Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn clear_all(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            match tokio::fs::remove_dir_all(&self.tiles_dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            tokio::fs::create_dir_all(&self.tiles_dir).await?;
            info!(path = %self.tiles_dir.display(), "Filesystem tile store cleared");
            Ok(())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        Box::pin(async move { Ok(CacheStats::unknown(StorageKind::Filesystem)) })
    }

    fn scan_stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        Box::pin(self.scan())
    }
}
