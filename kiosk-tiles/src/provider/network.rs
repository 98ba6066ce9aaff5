//! Tile fetcher for a templated HTTP tile server.

use bytes::Bytes;
use tracing::debug;

use super::http::HttpClient;
use super::template::UrlTemplate;
use super::types::{FetchError, TileFetcher};
use crate::cache::BoxFuture;
use crate::coord::{TileIndex, MAX_ZOOM};

/// Fetches tiles from an HTTP(S) endpoint and checks the payload is an image.
pub struct NetworkTileFetcher<C: HttpClient> {
    http_client: C,
    template: UrlTemplate,
}

impl<C: HttpClient> NetworkTileFetcher<C> {
    pub fn new(http_client: C, template: UrlTemplate) -> Self {
        Self {
            http_client,
            template,
        }
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }
}

/// Reject bodies that are not a known image format.
fn validate_image(body: &[u8], url: &str) -> Result<(), FetchError> {
    if body.is_empty() || image::guess_format(body).is_err() {
        return Err(FetchError::NotAnImage {
            url: url.to_string(),
        });
    }
    Ok(())
}

impl<C: HttpClient> TileFetcher for NetworkTileFetcher<C> {
    fn fetch(&self, tile: TileIndex) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        Box::pin(async move {
            if tile.z > MAX_ZOOM {
                return Err(FetchError::UnsupportedZoom(tile.z));
            }

            let url = self.template.url_for(tile);
            let body = self.http_client.get(&url).await?;
            validate_image(&body, &url)?;

            debug!(tile = %tile, bytes = body.len(), "Tile fetched");
            Ok(body)
        })
    }
}
