//! Application bootstrap and lifecycle management.
//!
//! [`TileCacheApp`] is the single entry point for front ends: it opens the
//! storage backend chosen in [`AppConfig`], builds the network fetcher and
//! wires the read path and download engine on top.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── TileCacheApp ────────────────────────────┐
//! │                                                                      │
//! │  resolve_tile ──► CacheAsideTileSource ──► MemoryTileCache           │
//! │                        │        │                                    │
//! │                        │        └──► BatchWriteQueue ──┐             │
//! │                        ▼                               ▼             │
//! │  start_download ─► DownloadOrchestrator ───────► Arc<dyn TileStore>  │
//! │  completion ─────► CompletionEstimator ─────────────────┘            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kiosk_tiles::app::{AppConfig, TileCacheApp};
//! use kiosk_tiles::orchestrator::RegionKind;
//!
//! let app = TileCacheApp::start(AppConfig::default()).await?;
//!
//! if let Some(handle) = app.ensure_region(RegionKind::Primary).await? {
//!     let stats = handle.wait().await?;
//! }
//!
//! app.shutdown().await;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{CacheReport, DownloadHandle, RegionReport, TileCacheApp};
pub use config::{AppConfig, NetworkConfig, DEFAULT_TIMEOUT, DEFAULT_URL_TEMPLATE};
pub use error::AppError;
