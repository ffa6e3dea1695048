//! Detail page category lookup.

use std::collections::HashMap;

use scraper::{Html, Selector};
use tracing::debug;

use super::PageFetcher;
use crate::models::UNKNOWN_CATEGORY;

/// Breadcrumb position holding the category: Home / Books / <category> / <title>.
const CATEGORY_CRUMB: usize = 2;

/// Extract the category from detail page markup.
pub fn extract_category(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let crumbs = Selector::parse("ul.breadcrumb a").ok()?;

    document
        .select(&crumbs)
        .nth(CATEGORY_CRUMB)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Resolve the category of the item at `detail_link`.
///
/// Never fails: an unreachable page or an unexpected layout yields
/// [`UNKNOWN_CATEGORY`] so one bad detail page cannot stall the listing.
pub async fn resolve_category<F>(fetcher: &F, detail_link: &str) -> String
where
    F: PageFetcher + ?Sized,
{
    let markup = match fetcher.fetch(detail_link).await {
        Ok(markup) => markup,
        Err(e) => {
            debug!(url = detail_link, error = %e, "detail fetch failed, category unknown");
            return UNKNOWN_CATEGORY.to_string();
        }
    };

    extract_category(&markup).unwrap_or_else(|| {
        debug!(url = detail_link, "no category breadcrumb on detail page");
        UNKNOWN_CATEGORY.to_string()
    })
}

/// Page-scoped memo of resolved categories keyed by detail link.
#[derive(Debug, Default)]
pub struct CategoryCache {
    entries: HashMap<String, String>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache; each distinct link is fetched once.
    pub async fn resolve<F>(&mut self, fetcher: &F, detail_link: &str) -> String
    where
        F: PageFetcher + ?Sized,
    {
        if let Some(category) = self.entries.get(detail_link) {
            return category.clone();
        }
        let category = resolve_category(fetcher, detail_link).await;
        self.entries
            .insert(detail_link.to_string(), category.clone());
        category
    }

    /// Distinct detail links resolved so far.
    pub fn fetched(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DETAIL: &str = r#"<html><body>
        <ul class="breadcrumb">
            <li><a href="../../index.html">Home</a></li>
            <li><a href="../category/books_1/index.html">Books</a></li>
            <li><a href="../category/books/poetry_23/index.html">
                Poetry
            </a></li>
            <li class="active">A Light in the Attic</li>
        </ul>
    </body></html>"#;

    struct OnePage {
        markup: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for OnePage {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.markup.map(str::to_string).ok_or_else(|| FetchError::Timeout {
                url: url.to_string(),
            })
        }
    }

    #[test]
    fn test_extract_category() {
        assert_eq!(extract_category(DETAIL).as_deref(), Some("Poetry"));
    }

    #[test]
    fn test_extract_category_short_breadcrumb() {
        let markup = r#"<ul class="breadcrumb"><li><a href="/">Home</a></li><li><a href="/b">Books</a></li></ul>"#;
        assert!(extract_category(markup).is_none());
        assert!(extract_category("<html><body><p>gone</p></body></html>").is_none());
    }

    #[tokio::test]
    async fn test_resolve_category_falls_back_on_layout() {
        let fetcher = OnePage {
            markup: Some("<html><body>no breadcrumb</body></html>"),
            calls: AtomicUsize::new(0),
        };
        let category = resolve_category(&fetcher, "https://example.test/item").await;
        assert_eq!(category, UNKNOWN_CATEGORY);
    }

    #[tokio::test]
    async fn test_resolve_category_falls_back_on_fetch_error() {
        let fetcher = OnePage {
            markup: None,
            calls: AtomicUsize::new(0),
        };
        let category = resolve_category(&fetcher, "https://example.test/item").await;
        assert_eq!(category, "unknown category");
    }

    #[tokio::test]
    async fn test_cache_fetches_each_link_once() {
        let fetcher = OnePage {
            markup: Some(DETAIL),
            calls: AtomicUsize::new(0),
        };
        let mut cache = CategoryCache::new();

        assert_eq!(cache.resolve(&fetcher, "https://example.test/a").await, "Poetry");
        assert_eq!(cache.resolve(&fetcher, "https://example.test/a").await, "Poetry");
        assert_eq!(cache.resolve(&fetcher, "https://example.test/b").await, "Poetry");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.fetched(), 2);
    }
}
