//! Listing page parser: item entries and the pagination cursor.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{Rating, RawItem};

/// Base that relative item and pagination links are joined onto.
pub const CATALOGUE_BASE: &str = "https://books.toscrape.com/catalogue/";

/// First listing page of the catalogue.
pub const FIRST_PAGE: &str = "https://books.toscrape.com/catalogue/page-1.html";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse selector {selector:?}: {message}")]
    Selector {
        selector: &'static str,
        message: String,
    },

    #[error("item entry {index} has no {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("cannot resolve link {href:?} against {base}: {source}")]
    InvalidUrl {
        href: String,
        base: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything extracted from one listing page.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub items: Vec<RawItem>,
    /// `None` marks the end of the catalogue.
    pub next_url: Option<String>,
}

struct ListingSelectors {
    item: Selector,
    title_link: Selector,
    rating: Selector,
    price: Selector,
    availability: Selector,
    next_link: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            item: selector("article.product_pod")?,
            title_link: selector("h3 > a")?,
            rating: selector("p.star-rating")?,
            price: selector("p.price_color")?,
            availability: selector("p.availability")?,
            next_link: selector("li.next a")?,
        })
    }
}

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css,
        message: format!("{:?}", e),
    })
}

/// Parser for catalogue listing pages.
pub struct CatalogParser {
    base: Url,
    selectors: ListingSelectors,
}

impl CatalogParser {
    /// Create a parser that resolves links against `base`.
    pub fn new(base: &str) -> Result<Self, ParseError> {
        let base = Url::parse(base).map_err(|e| ParseError::InvalidUrl {
            href: base.to_string(),
            base: String::new(),
            source: e,
        })?;

        Ok(Self {
            base,
            selectors: ListingSelectors::new()?,
        })
    }

    /// Parser rooted at [`CATALOGUE_BASE`].
    pub fn catalogue() -> Result<Self, ParseError> {
        Self::new(CATALOGUE_BASE)
    }

    /// Extract item entries and the next page URL from listing markup.
    ///
    /// A page without item entries yields an empty list. An entry missing a
    /// required field means the page layout is not one we understand.
    pub fn parse_listing(&self, markup: &str) -> Result<Listing, ParseError> {
        let document = Html::parse_document(markup);

        let items = document
            .select(&self.selectors.item)
            .enumerate()
            .map(|(index, entry)| self.parse_item(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let next_url = match document
            .select(&self.selectors.next_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
        {
            Some(href) => Some(self.join(href)?),
            None => None,
        };

        debug!(
            items = items.len(),
            next = next_url.as_deref().unwrap_or("-"),
            "parsed listing page"
        );

        Ok(Listing { items, next_url })
    }

    fn parse_item(&self, index: usize, entry: ElementRef<'_>) -> Result<RawItem, ParseError> {
        let missing = |field| ParseError::MissingField { index, field };

        let link = entry
            .select(&self.selectors.title_link)
            .next()
            .ok_or_else(|| missing("title link"))?;

        let title = link
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("title"))?;

        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| missing("detail link"))?;

        // "star-rating Three" -> Three
        let rating = entry
            .select(&self.selectors.rating)
            .next()
            .and_then(|p| p.value().attr("class"))
            .and_then(|class| class.split_whitespace().nth(1))
            .map(Rating::from_class_token)
            .unwrap_or(Rating::Unrated);

        let price_text = entry
            .select(&self.selectors.price)
            .next()
            .map(|p| element_text(&p))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("price"))?;

        let availability_text = entry
            .select(&self.selectors.availability)
            .next()
            .map(|p| element_text(&p))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("availability"))?;

        Ok(RawItem {
            title: title.to_string(),
            rating,
            price_text,
            availability_text,
            detail_link: self.join(href)?,
        })
    }

    fn join(&self, href: &str) -> Result<String, ParseError> {
        self.base
            .join(href)
            .map(String::from)
            .map_err(|e| ParseError::InvalidUrl {
                href: href.to_string(),
                base: self.base.to_string(),
                source: e,
            })
    }
}

/// Element text with runs of whitespace collapsed to single spaces.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, href: &str, rating: &str, price: &str) -> String {
        format!(
            r#"<article class="product_pod">
                <div class="image_container"><a href="{href}"><img src="x.jpg" alt="{title}"></a></div>
                <p class="star-rating {rating}"><i class="icon-star"></i></p>
                <h3><a href="{href}" title="{title}">{title}</a></h3>
                <div class="product_price">
                    <p class="price_color">{price}</p>
                    <p class="instock availability">
                        <i class="icon-ok"></i>
                        In stock
                    </p>
                </div>
            </article>"#
        )
    }

    fn page(entries: &[String], next: Option<&str>) -> String {
        let items: String = entries
            .iter()
            .map(|e| format!("<li class=\"col-xs-6\">{e}</li>"))
            .collect();
        let pager = next
            .map(|n| format!(r#"<ul class="pager"><li class="next"><a href="{n}">next</a></li></ul>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body><section><ol class="row">{items}</ol><div>{pager}</div></section></body></html>"#
        )
    }

    #[test]
    fn test_parse_listing_items() {
        let markup = page(
            &[
                entry(
                    "A Light in the Attic",
                    "a-light-in-the-attic_1000/index.html",
                    "Three",
                    "£51.77",
                ),
                entry("Tipping the Velvet", "tipping-the-velvet_999/index.html", "One", "£53.74"),
            ],
            Some("page-2.html"),
        );

        let listing = CatalogParser::catalogue().unwrap().parse_listing(&markup).unwrap();
        assert_eq!(listing.items.len(), 2);

        let first = &listing.items[0];
        assert_eq!(first.title, "A Light in the Attic");
        assert_eq!(first.rating, Rating::Three);
        assert_eq!(first.price_text, "£51.77");
        assert_eq!(first.availability_text, "In stock");
        assert_eq!(
            first.detail_link,
            "https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html"
        );
        assert_eq!(listing.items[1].rating.as_str(), "1 star");

        assert_eq!(
            listing.next_url.as_deref(),
            Some("https://books.toscrape.com/catalogue/page-2.html")
        );
    }

    #[test]
    fn test_parse_listing_counts_every_entry() {
        let entries: Vec<String> = (0..20)
            .map(|i| entry(&format!("Book {i}"), &format!("book_{i}/index.html"), "Two", "£10.00"))
            .collect();
        let listing = CatalogParser::catalogue()
            .unwrap()
            .parse_listing(&page(&entries, None))
            .unwrap();

        assert_eq!(listing.items.len(), 20);
        assert!(listing
            .items
            .iter()
            .all(|i| !i.title.is_empty() && !i.price_text.is_empty()));
    }

    #[test]
    fn test_unknown_or_missing_rating_is_unrated() {
        let no_rating = entry("Soumission", "soumission_998/index.html", "Zero", "£50.10")
            .replace(r#"<p class="star-rating Zero"><i class="icon-star"></i></p>"#, "");
        let markup = page(
            &[
                entry("Sharp Objects", "sharp-objects_997/index.html", "Seven", "£47.82"),
                no_rating,
            ],
            None,
        );

        let listing = CatalogParser::catalogue().unwrap().parse_listing(&markup).unwrap();
        assert_eq!(listing.items[0].rating, Rating::Unrated);
        assert_eq!(listing.items[1].rating, Rating::Unrated);
    }

    #[test]
    fn test_last_page_has_no_next_url() {
        let markup = page(&[entry("Last", "last_1/index.html", "Five", "£1.00")], None);
        let listing = CatalogParser::catalogue().unwrap().parse_listing(&markup).unwrap();
        assert!(listing.next_url.is_none());

        // Next control without a link also ends the catalogue
        let markup = markup.replace(
            "</section>",
            r#"<ul class="pager"><li class="next">next</li></ul></section>"#,
        );
        let listing = CatalogParser::catalogue().unwrap().parse_listing(&markup).unwrap();
        assert!(listing.next_url.is_none());
    }

    #[test]
    fn test_page_without_items_is_empty_not_error() {
        let markup = page(&[], Some("page-3.html"));
        let listing = CatalogParser::catalogue().unwrap().parse_listing(&markup).unwrap();
        assert!(listing.items.is_empty());
        assert_eq!(
            listing.next_url.as_deref(),
            Some("https://books.toscrape.com/catalogue/page-3.html")
        );

        let listing = CatalogParser::catalogue().unwrap().parse_listing("").unwrap();
        assert!(listing.items.is_empty());
        assert!(listing.next_url.is_none());
    }

    #[test]
    fn test_entry_without_price_is_parse_failure() {
        let broken = entry("Broken", "broken_1/index.html", "Two", "£1.00")
            .replace(r#"<p class="price_color">£1.00</p>"#, "");
        let markup = page(&[entry("Fine", "fine_1/index.html", "Two", "£2.00"), broken], None);

        let err = CatalogParser::catalogue()
            .unwrap()
            .parse_listing(&markup)
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField {
                index: 1,
                field: "price"
            }
        ));
    }

    #[test]
    fn test_entry_without_title_attribute_is_parse_failure() {
        let broken = entry("Untitled", "untitled_1/index.html", "Two", "£1.00")
            .replace(r#" title="Untitled""#, "");
        let err = CatalogParser::catalogue()
            .unwrap()
            .parse_listing(&page(&[broken], None))
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field: "title", .. }));
    }

    #[test]
    fn test_relative_links_resolve_against_base() {
        let markup = page(
            &[entry("Up", "../../../up_5/index.html", "Four", "£5.00")],
            Some("/catalogue/page-9.html"),
        );
        let listing = CatalogParser::catalogue().unwrap().parse_listing(&markup).unwrap();
        assert_eq!(
            listing.items[0].detail_link,
            "https://books.toscrape.com/up_5/index.html"
        );
        assert_eq!(
            listing.next_url.as_deref(),
            Some("https://books.toscrape.com/catalogue/page-9.html")
        );
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            CatalogParser::new("not a base"),
            Err(ParseError::InvalidUrl { .. })
        ));
    }
}
