//! The harvest loop: fetch, parse, resolve, normalize and persist, page by
//! page, forever.
//!
//! [`Driver`] is an explicit state machine. Each call to [`Driver::step`]
//! performs one transition, so the loop can be driven to completion by
//! [`Driver::run`] or inspected transition by transition in tests.

mod driver;
mod state;
mod stats;

pub use driver::{Driver, DriverConfig, DEFAULT_INTERVAL};
pub use state::{DriverState, SleepReason};
pub use stats::TraversalStats;

use std::fmt;

use thiserror::Error;

use crate::repository::SinkError;
use crate::scrapers::{FetchError, ParseError};

/// Pipeline stage, as reported in failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    Resolve,
    Normalize,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Resolve => "resolve",
            Self::Normalize => "normalize",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure that aborts processing of the current page.
///
/// The driver answers every variant the same way: sleep, then retry the
/// same URL.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Persist(#[from] SinkError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch(_) => Stage::Fetch,
            Self::Parse(_) => Stage::Parse,
            Self::Persist(_) => Stage::Persist,
        }
    }
}
