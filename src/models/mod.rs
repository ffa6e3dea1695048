//! Data models for the catalogue harvester.

mod item;
mod record;

pub use item::{Rating, RawItem, ResolvedItem, UNKNOWN_CATEGORY};
pub use record::{CatalogRecord, Price, MAX_TEXT_LEN};
