//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::ValueEnum;
use kiosk_tiles::app::AppConfig;
use kiosk_tiles::cache::{default_data_dir, BackendConfig};

/// Storage backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackendArg {
    /// Single SQLite database file (tiles.db)
    Kv,
    /// One PNG file per tile under map-tiles/
    Fs,
}

/// Build the app config from the global flags.
///
/// The cache directory defaults to the platform data directory.
pub fn build_config(backend: BackendArg, cache_dir: Option<PathBuf>) -> AppConfig {
    let dir = cache_dir.unwrap_or_else(default_data_dir);
    let backend = match backend {
        BackendArg::Kv => BackendConfig::key_value_in(&dir),
        BackendArg::Fs => BackendConfig::filesystem_in(&dir),
    };
    AppConfig::new(backend)
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_tiles::cache::StorageKind;

    #[test]
    fn test_build_config_key_value() {
        let config = build_config(BackendArg::Kv, Some(PathBuf::from("/srv/kiosk")));
        assert_eq!(config.backend.kind(), StorageKind::KeyValue);
        assert_eq!(
            config.backend,
            BackendConfig::KeyValue {
                path: PathBuf::from("/srv/kiosk/tiles.db")
            }
        );
    }

    #[test]
    fn test_build_config_filesystem() {
        let config = build_config(BackendArg::Fs, Some(PathBuf::from("/srv/kiosk")));
        assert_eq!(
            config.backend,
            BackendConfig::Filesystem {
                root: PathBuf::from("/srv/kiosk")
            }
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
