//! Per-traversal counters.

use tracing::info;

/// Counters for one pass over the catalogue, from page one to the last page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub pages: usize,
    pub items: usize,
    /// Items that normalized into records.
    pub normalized: usize,
    /// Items whose category fell back to the sentinel.
    pub unknown_categories: usize,
    pub normalize_failures: usize,
    pub inserted: usize,
    /// Records skipped because their natural key was already stored.
    pub duplicates: usize,
    /// Page attempts that failed and were retried.
    pub page_failures: usize,
}

impl TraversalStats {
    /// Add another tally (typically one finished page) to this one.
    pub(crate) fn absorb(&mut self, other: &TraversalStats) {
        self.pages += other.pages;
        self.items += other.items;
        self.normalized += other.normalized;
        self.unknown_categories += other.unknown_categories;
        self.normalize_failures += other.normalize_failures;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.page_failures += other.page_failures;
    }

    pub(crate) fn log_summary(&self) {
        info!(
            pages = self.pages,
            items = self.items,
            normalized = self.normalized,
            inserted = self.inserted,
            duplicates = self.duplicates,
            unknown_categories = self.unknown_categories,
            normalize_failures = self.normalize_failures,
            page_failures = self.page_failures,
            "catalog traversal complete"
        );
    }
}
