//! Normalized catalogue records, the unit of persistence.

use std::fmt;

use chrono::{DateTime, Utc};

use super::Rating;

/// Column width of the bounded text fields, in characters.
pub const MAX_TEXT_LEN: usize = 250;

/// Non-negative amount with two fractional digits, held as minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: i64,
}

impl Price {
    /// Returns `None` for negative amounts.
    pub fn from_cents(cents: i64) -> Option<Self> {
        (cents >= 0).then_some(Self { cents })
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// A catalogue entry ready to be stored.
///
/// Immutable once persisted: the sink inserts it or discards it when the
/// `(title, category)` pair is already present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub title: String,
    pub rating: Rating,
    pub category: String,
    pub price: Price,
    pub availability: String,
    /// Transform time, whole seconds.
    pub observed_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Names of the bounded text fields that exceed [`MAX_TEXT_LEN`].
    ///
    /// Oversized values are kept as-is; truncating would alter the natural key.
    pub fn oversized_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("category", &self.category),
            ("availability", &self.availability),
        ]
        .into_iter()
        .filter(|(_, value)| value.chars().count() > MAX_TEXT_LEN)
        .map(|(name, _)| name)
        .collect()
    }

    /// The natural key.
    pub fn key(&self) -> (&str, &str) {
        (&self.title, &self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> CatalogRecord {
        CatalogRecord {
            title: title.to_string(),
            rating: Rating::Two,
            category: "Poetry".to_string(),
            price: Price::from_cents(5177).unwrap(),
            availability: "In stock".to_string(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(5177).unwrap().to_string(), "51.77");
        assert_eq!(Price::from_cents(5).unwrap().to_string(), "0.05");
        assert_eq!(Price::from_cents(129900).unwrap().to_string(), "1299.00");
        assert!(Price::from_cents(-1).is_none());
    }

    #[test]
    fn test_oversized_fields() {
        assert!(record("A Light in the Attic").oversized_fields().is_empty());

        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert_eq!(record(&long).oversized_fields(), vec!["title"]);

        // Multi-byte characters count once each
        let exact = "é".repeat(MAX_TEXT_LEN);
        assert!(record(&exact).oversized_fields().is_empty());
    }
}
