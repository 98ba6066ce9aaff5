//! Application configuration for TileCacheApp.
//!
//! All settings have compiled-in defaults; there is no configuration file.
//! Front ends override individual fields through the `with_*` builders.

use std::time::Duration;

use crate::cache::{BackendConfig, BatchConfig, DEFAULT_MEMORY_TILES};
use crate::source::ProgressiveConfig;

/// Default tile endpoint.
pub const DEFAULT_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tile server settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// URL with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders.
    pub url_template: String,
    /// Values rotated through `{s}`.
    pub subdomains: Vec<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            subdomains: vec!["a".into(), "b".into(), "c".into()],
            user_agent: format!("kiosk-tiles/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Application configuration combining all component configs.
///
/// This is the top-level configuration passed to `TileCacheApp::start()`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Storage backend, chosen once at startup.
    pub backend: BackendConfig,

    pub network: NetworkConfig,

    /// Render-path write coalescing.
    pub batch: BatchConfig,

    /// Tiles kept in the memory tier.
    pub memory_tiles: u64,

    pub progressive: ProgressiveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl AppConfig {
    /// Config for `backend` with every other setting at its default.
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            network: NetworkConfig::default(),
            batch: BatchConfig::default(),
            memory_tiles: DEFAULT_MEMORY_TILES,
            progressive: ProgressiveConfig::default(),
        }
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_memory_tiles(mut self, tiles: u64) -> Self {
        self.memory_tiles = tiles;
        self
    }

    /// Enable or disable progressive prefetch.
    pub fn with_progressive(mut self, enabled: bool) -> Self {
        self.progressive.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StorageKind;

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.subdomains, vec!["a", "b", "c"]);
        assert!(config.user_agent.starts_with("kiosk-tiles/"));
    }

    #[test]
    fn test_app_config_new() {
        let config = AppConfig::new(BackendConfig::key_value_in("/cache"));
        assert_eq!(config.backend.kind(), StorageKind::KeyValue);
        assert_eq!(config.memory_tiles, 500);
        assert_eq!(config.batch.batch_size, 10);
        assert!(!config.progressive.enabled);
    }

    #[test]
    fn test_app_config_builders() {
        let config = AppConfig::new(BackendConfig::filesystem_in("/cache"))
            .with_memory_tiles(50)
            .with_progressive(true)
            .with_batch(BatchConfig::default().with_batch_size(4));

        assert_eq!(config.memory_tiles, 50);
        assert!(config.progressive.enabled);
        assert_eq!(config.batch.batch_size, 4);
    }
}
