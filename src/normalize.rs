//! Conversion of resolved listing entries into typed catalogue records.
//!
//! Prices use `.` as the decimal separator and `,` only as a thousands
//! separator in groups of three (`£1,299.00`). A comma anywhere else, as in
//! the comma-decimal form `£13,99`, is rejected rather than guessed at.

use std::sync::LazyLock;

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use thiserror::Error;

use crate::models::{CatalogRecord, Price, ResolvedItem};

static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?$").unwrap()
});

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unparseable price {value:?} for {title:?}")]
    InvalidPrice { title: String, value: String },
}

/// Parse a displayed price such as `£51.77` into a [`Price`].
pub fn parse_price(text: &str) -> Option<Price> {
    let amount = text
        .trim()
        .trim_start_matches(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '.' | ',')))
        .trim();

    let captures = AMOUNT_PATTERN.captures(amount)?;
    let integer_part: String = amount
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let units: i64 = integer_part.parse().ok()?;

    let cents = match captures.get(1).map(|m| m.as_str()) {
        Some(frac) if frac.len() == 1 => frac.parse::<i64>().ok()? * 10,
        Some(frac) => frac.parse::<i64>().ok()?,
        None => 0,
    };

    Price::from_cents(units.checked_mul(100)?.checked_add(cents)?)
}

/// Normalize an item observed at `observed_at`.
///
/// Text fields pass through untouched; length bounds are reported by
/// [`CatalogRecord::oversized_fields`] and warned about at the sink.
pub fn normalize(
    resolved: ResolvedItem,
    observed_at: DateTime<Utc>,
) -> Result<CatalogRecord, NormalizeError> {
    let ResolvedItem { item, category } = resolved;

    let price = parse_price(&item.price_text).ok_or_else(|| NormalizeError::InvalidPrice {
        title: item.title.clone(),
        value: item.price_text.clone(),
    })?;

    Ok(CatalogRecord {
        title: item.title,
        rating: item.rating,
        category,
        price,
        availability: item.availability_text,
        observed_at: observed_at.trunc_subsecs(0),
    })
}

/// Normalize an item stamped with the current wall-clock time.
pub fn normalize_now(resolved: ResolvedItem) -> Result<CatalogRecord, NormalizeError> {
    normalize(resolved, Utc::now())
}
