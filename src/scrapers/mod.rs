//! Listing and detail page scraping for the catalogue.

pub mod catalog;
pub mod detail;
mod http_client;

pub use catalog::{CatalogParser, Listing, ParseError, CATALOGUE_BASE, FIRST_PAGE};
pub use detail::{extract_category, resolve_category, CategoryCache};
pub use http_client::{FetchError, HttpClient, USER_AGENT};

use async_trait::async_trait;

/// Source of raw page markup.
///
/// Implemented by [`HttpClient`] for the live site; the pipeline only sees
/// this trait so it can be driven from canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
