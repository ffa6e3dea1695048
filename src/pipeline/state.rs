//! Driver states.

use super::Stage;
use crate::models::{CatalogRecord, ResolvedItem};
use crate::scrapers::Listing;

/// Why the driver is sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    /// The last page had no next link; the traversal is complete.
    EndOfCatalog,
    /// A page-level stage failed; the same page is retried after the sleep.
    StageFailed(Stage),
}

/// State of the harvest loop. The current URL lives only in here.
#[derive(Debug)]
pub enum DriverState {
    Idle,
    FetchingPage {
        url: String,
    },
    ParsingPage {
        url: String,
        markup: String,
    },
    ResolvingDetails {
        url: String,
        listing: Listing,
    },
    Normalizing {
        url: String,
        items: Vec<ResolvedItem>,
        next_url: Option<String>,
    },
    Persisting {
        url: String,
        records: Vec<CatalogRecord>,
        next_url: Option<String>,
    },
    Sleeping {
        resume_url: String,
        reason: SleepReason,
    },
    Stopped,
}

impl DriverState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingPage { .. } => "fetching_page",
            Self::ParsingPage { .. } => "parsing_page",
            Self::ResolvingDetails { .. } => "resolving_details",
            Self::Normalizing { .. } => "normalizing",
            Self::Persisting { .. } => "persisting",
            Self::Sleeping { .. } => "sleeping",
            Self::Stopped => "stopped",
        }
    }

    /// URL the state is working on, or will resume at.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::FetchingPage { url }
            | Self::ParsingPage { url, .. }
            | Self::ResolvingDetails { url, .. }
            | Self::Normalizing { url, .. }
            | Self::Persisting { url, .. } => Some(url),
            Self::Sleeping { resume_url, .. } => Some(resume_url),
            Self::Idle | Self::Stopped => None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// True once a full traversal has ended and the driver waits to restart.
    pub fn is_end_of_catalog(&self) -> bool {
        matches!(
            self,
            Self::Sleeping {
                reason: SleepReason::EndOfCatalog,
                ..
            }
        )
    }
}
