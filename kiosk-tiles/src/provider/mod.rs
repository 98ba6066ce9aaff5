//! Network side of the cache.
//!
//! The engine only depends on [`TileFetcher`]. The production fetcher is a
//! [`NetworkTileFetcher`] over a [`ReqwestClient`], addressing the tile
//! server through a [`UrlTemplate`]:
//!
//! ```ignore
//! use std::time::Duration;
//! use kiosk_tiles::provider::{NetworkTileFetcher, ReqwestClient, UrlTemplate};
//!
//! let client = ReqwestClient::new("kiosk-tiles/0.3", Duration::from_secs(30))?;
//! let template = UrlTemplate::new(
//!     "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
//!     vec!["a".into(), "b".into(), "c".into()],
//! )?;
//! let fetcher = NetworkTileFetcher::new(client, template);
//! ```

mod http;
mod network;
mod template;
mod types;

pub use http::{HttpClient, ReqwestClient};
pub use network::NetworkTileFetcher;
pub use template::UrlTemplate;
pub use types::{FetchError, TileFetcher};

#[cfg(test)]
pub use http::tests::MockHttpClient;
