//! Items as they come off listing and detail pages, before normalization.

use std::fmt;

/// Category substituted when the detail page cannot be resolved.
pub const UNKNOWN_CATEGORY: &str = "unknown category";

/// Star rating of a catalogue entry.
///
/// Listing pages encode the rating as the second class token of
/// `p.star-rating` (`star-rating Three`). Anything outside the five known
/// tiers, including a missing element, is `Unrated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    One,
    Two,
    Three,
    Four,
    Five,
    Unrated,
}

impl Rating {
    /// Map a class token (`"One"` .. `"Five"`) to a rating.
    pub fn from_class_token(token: &str) -> Self {
        match token {
            "One" => Self::One,
            "Two" => Self::Two,
            "Three" => Self::Three,
            "Four" => Self::Four,
            "Five" => Self::Five,
            _ => Self::Unrated,
        }
    }

    /// Persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "1 star",
            Self::Two => "2 stars",
            Self::Three => "3 stars",
            Self::Four => "4 stars",
            Self::Five => "5 stars",
            Self::Unrated => "unrated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1 star" => Some(Self::One),
            "2 stars" => Some(Self::Two),
            "3 stars" => Some(Self::Three),
            "4 stars" => Some(Self::Four),
            "5 stars" => Some(Self::Five),
            "unrated" => Some(Self::Unrated),
            _ => None,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry extracted from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub rating: Rating,
    /// Price exactly as displayed, currency symbol included.
    pub price_text: String,
    pub availability_text: String,
    /// Absolute URL of the item's detail page.
    pub detail_link: String,
}

impl RawItem {
    /// Attach the category resolved from the detail page.
    pub fn resolve(self, category: impl Into<String>) -> ResolvedItem {
        ResolvedItem {
            item: self,
            category: category.into(),
        }
    }
}

/// A listing entry together with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub item: RawItem,
    pub category: String,
}

impl ResolvedItem {
    /// True when the category fell back to the sentinel.
    pub fn has_unknown_category(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }
}
