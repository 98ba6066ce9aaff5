//! Tile URL templates.
//!
//! A template such as `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`
//! is expanded per tile. `{s}` rotates through the configured subdomains so
//! consecutive requests spread across the server's hosts.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::FetchError;
use crate::coord::TileIndex;

/// Tile URL template with round-robin subdomains.
#[derive(Debug)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<String>,
    next: AtomicUsize,
}

impl UrlTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// The template must contain `{z}`, `{x}` and `{y}`. A `{s}` token needs
    /// at least one subdomain.
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Result<Self, FetchError> {
        let template = template.into();

        for token in ["{z}", "{x}", "{y}"] {
            if !template.contains(token) {
                return Err(FetchError::InvalidTemplate(format!(
                    "missing {} in {}",
                    token, template
                )));
            }
        }
        if template.contains("{s}") && subdomains.is_empty() {
            return Err(FetchError::InvalidTemplate(format!(
                "{} uses {{s}} but no subdomains are configured",
                template
            )));
        }

        Ok(Self {
            template,
            subdomains,
            next: AtomicUsize::new(0),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// URL for `tile`, advancing the subdomain rotation.
    pub fn url_for(&self, tile: TileIndex) -> String {
        let mut url = self
            .template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string());

        if url.contains("{s}") {
            let index = self.next.fetch_add(1, Ordering::Relaxed) % self.subdomains.len();
            url = url.replace("{s}", &self.subdomains[index]);
        }
        url
    }
}
