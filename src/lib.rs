//! Catalogue harvester.
//!
//! Walks a paginated product catalogue page by page, resolves each item's
//! category from its detail page, normalizes the result and stores it in a
//! relational table keyed by `(title, category)`. After the last page the
//! harvester sleeps and starts over from page one.

pub mod cli;
pub mod config;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod repository;
pub mod schema;
pub mod scrapers;
