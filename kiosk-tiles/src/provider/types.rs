//! Fetch contract and errors.

use bytes::Bytes;
use thiserror::Error;

use crate::cache::BoxFuture;
use crate::coord::TileIndex;

/// Errors from fetching a tile over the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Connection, timeout or body read failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Body is empty or not a recognised image format.
    #[error("Response from {url} is not an image")]
    NotAnImage { url: String },

    /// Tile zoom is beyond what the endpoint serves.
    #[error("Unsupported zoom level: {0}")]
    UnsupportedZoom(u8),

    /// URL template is missing a placeholder or subdomains.
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    /// HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Source of tile bytes from the network.
///
/// Implemented by [`NetworkTileFetcher`](super::NetworkTileFetcher) for the
/// real tile server and by test doubles.
pub trait TileFetcher: Send + Sync {
    /// Fetch the image for one tile.
    fn fetch(&self, tile: TileIndex) -> BoxFuture<'_, Result<Bytes, FetchError>>;
}
