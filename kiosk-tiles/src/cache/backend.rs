//! Backend selection.
//!
//! The execution environment decides the backend once, at startup. The rest
//! of the engine only sees `Arc<dyn TileStore>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::providers::{FilesystemTileStore, KeyValueTileStore};
use super::stats::StorageKind;
use super::traits::{StoreError, TileStore};

/// Application directory name under the platform data directory.
pub const APP_DIR_NAME: &str = "kiosk-tiles";

/// File name of the embedded key-value database.
pub const KV_FILE_NAME: &str = "tiles.db";

/// Which storage backend to open, with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Embedded SQLite database file.
    KeyValue { path: PathBuf },
    /// Directory root; tiles go under `<root>/map-tiles`.
    Filesystem { root: PathBuf },
}

impl BackendConfig {
    /// Key-value backend inside `dir`.
    pub fn key_value_in(dir: impl AsRef<Path>) -> Self {
        BackendConfig::KeyValue {
            path: dir.as_ref().join(KV_FILE_NAME),
        }
    }

    /// Filesystem backend rooted at `dir`.
    pub fn filesystem_in(dir: impl AsRef<Path>) -> Self {
        BackendConfig::Filesystem {
            root: dir.as_ref().to_path_buf(),
        }
    }

    /// Storage kind this configuration opens.
    pub fn kind(&self) -> StorageKind {
        match self {
            BackendConfig::KeyValue { .. } => StorageKind::KeyValue,
            BackendConfig::Filesystem { .. } => StorageKind::Filesystem,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::filesystem_in(default_data_dir())
    }
}

/// Platform data directory for the cache.
///
/// Falls back to the working directory when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Open the configured backend.
pub fn open_store(config: &BackendConfig) -> Result<Arc<dyn TileStore>, StoreError> {
    let store: Arc<dyn TileStore> = match config {
        BackendConfig::KeyValue { path } => Arc::new(KeyValueTileStore::open(path)?),
        BackendConfig::Filesystem { root } => Arc::new(FilesystemTileStore::new(root.clone())),
    };
    info!(backend = %config.kind(), "Tile storage backend selected");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileIndex;
    use bytes::Bytes;
    use tempfile::TempDir;

    #[test]
    fn test_key_value_in_appends_file_name() {
        let config = BackendConfig::key_value_in("/srv/kiosk");
        assert_eq!(
            config,
            BackendConfig::KeyValue {
                path: PathBuf::from("/srv/kiosk/tiles.db")
            }
        );
        assert_eq!(config.kind(), StorageKind::KeyValue);
    }

    #[test]
    fn test_default_is_filesystem() {
        let config = BackendConfig::default();
        assert_eq!(config.kind(), StorageKind::Filesystem);
    }

    #[test]
    fn test_config_serializes_tagged() {
        let config = BackendConfig::filesystem_in("/tmp/t");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"kind\":\"filesystem\""));
    }

    #[tokio::test]
    async fn test_open_store_both_backends_roundtrip() {
        let dir = TempDir::new().unwrap();
        let tile = TileIndex::new(7, 33, 47);

        for config in [
            BackendConfig::key_value_in(dir.path()),
            BackendConfig::filesystem_in(dir.path()),
        ] {
            let store = open_store(&config).unwrap();
            store.save_tile(tile, Bytes::from_static(b"tile")).await.unwrap();
            assert_eq!(
                store.get_tile(tile).await.unwrap(),
                Some(Bytes::from_static(b"tile"))
            );
            assert_eq!(store.stats().await.unwrap().storage, config.kind());
        }
    }
}
