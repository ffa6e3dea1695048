//! The polling driver.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{DriverState, SleepReason};
use super::stats::TraversalStats;
use super::{PipelineError, Stage};
use crate::models::CatalogRecord;
use crate::normalize::normalize_now;
use crate::repository::RecordSink;
use crate::scrapers::{CatalogParser, CategoryCache, PageFetcher, FIRST_PAGE};

/// Pause between traversals and before retrying a failed page.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Page every traversal starts from.
    pub start_url: String,
    pub interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            start_url: FIRST_PAGE.to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Sequential harvest loop over the catalogue.
///
/// One page is fetched, parsed, resolved, normalized and persisted before
/// the next is requested, so memory stays bounded to a single page.
pub struct Driver<F, S> {
    fetcher: F,
    sink: S,
    parser: CatalogParser,
    config: DriverConfig,
    state: DriverState,
    shutdown: watch::Receiver<bool>,
    stats: TraversalStats,
    /// Tally of the page in flight, merged into `stats` once it is persisted.
    page: TraversalStats,
    last_traversal: Option<TraversalStats>,
}

impl<F, S> Driver<F, S>
where
    F: PageFetcher,
    S: RecordSink,
{
    /// Create a driver in the `Idle` state with no shutdown signal attached.
    pub fn new(fetcher: F, sink: S, parser: CatalogParser, config: DriverConfig) -> Self {
        let (_tx, shutdown) = watch::channel(false);
        Self {
            fetcher,
            sink,
            parser,
            config,
            state: DriverState::Idle,
            shutdown,
            stats: TraversalStats::default(),
            page: TraversalStats::default(),
            last_traversal: None,
        }
    }

    /// Stop when the receiver observes `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Counters of the traversal in progress.
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Counters of the most recently completed traversal.
    pub fn last_traversal(&self) -> Option<&TraversalStats> {
        self.last_traversal.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run until the shutdown signal fires.
    pub async fn run(&mut self) {
        info!(
            start_url = %self.config.start_url,
            interval_secs = self.config.interval.as_secs(),
            "harvester started"
        );

        while !self.step().await.is_stopped() {}

        info!("shutdown requested, stopping harvester");
    }

    /// Run a single traversal and return its counters.
    ///
    /// Failed pages are still retried after the interval. Returns `None` if
    /// the shutdown signal fires first.
    pub async fn run_once(&mut self) -> Option<TraversalStats> {
        loop {
            let state = self.step().await;
            if state.is_end_of_catalog() {
                return self.last_traversal;
            }
            if state.is_stopped() {
                info!("shutdown requested, stopping harvester");
                return None;
            }
        }
    }

    /// Perform exactly one state transition.
    pub async fn step(&mut self) -> &DriverState {
        if self.shutdown_requested() {
            self.state = DriverState::Stopped;
            return &self.state;
        }

        let state = std::mem::replace(&mut self.state, DriverState::Idle);
        self.state = match state {
            DriverState::Idle => DriverState::FetchingPage {
                url: self.config.start_url.clone(),
            },

            DriverState::FetchingPage { url } => {
                self.page = TraversalStats::default();
                let fetched = self.fetcher.fetch(&url).await;
                match fetched {
                    Ok(markup) => DriverState::ParsingPage { url, markup },
                    Err(e) => self.page_failed(url, e.into()),
                }
            }

            DriverState::ParsingPage { url, markup } => {
                let parsed = self.parser.parse_listing(&markup);
                match parsed {
                    Ok(listing) => DriverState::ResolvingDetails { url, listing },
                    Err(e) => self.page_failed(url, e.into()),
                }
            }

            DriverState::ResolvingDetails { url, listing } => {
                self.page.items = listing.items.len();
                let mut cache = CategoryCache::new();
                let mut items = Vec::with_capacity(listing.items.len());
                for item in listing.items {
                    let category = cache.resolve(&self.fetcher, &item.detail_link).await;
                    let resolved = item.resolve(category);
                    if resolved.has_unknown_category() {
                        self.page.unknown_categories += 1;
                        debug!(
                            stage = %Stage::Resolve,
                            title = %resolved.item.title,
                            "category unresolved, using sentinel"
                        );
                    }
                    items.push(resolved);
                }
                debug!(
                    url = %url,
                    items = items.len(),
                    detail_pages = cache.fetched(),
                    "categories resolved"
                );
                DriverState::Normalizing {
                    url,
                    items,
                    next_url: listing.next_url,
                }
            }

            DriverState::Normalizing {
                url,
                items,
                next_url,
            } => {
                let mut records: Vec<CatalogRecord> = Vec::with_capacity(items.len());
                for item in items {
                    match normalize_now(item) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            self.page.normalize_failures += 1;
                            warn!(stage = %Stage::Normalize, url = %url, error = %e, "skipping item");
                        }
                    }
                }
                self.page.normalized = records.len();
                DriverState::Persisting {
                    url,
                    records,
                    next_url,
                }
            }

            DriverState::Persisting {
                url,
                records,
                next_url,
            } => {
                let persisted = self.sink.persist_batch(&records).await;
                match persisted {
                    Ok(inserted) => {
                        self.page_done(&url, records.len(), inserted);
                        match next_url {
                            Some(next) => DriverState::FetchingPage { url: next },
                            None => self.traversal_done(),
                        }
                    }
                    Err(e) => self.page_failed(url, e.into()),
                }
            }

            DriverState::Sleeping { resume_url, reason } => {
                debug!(
                    resume_url = %resume_url,
                    reason = ?reason,
                    secs = self.config.interval.as_secs_f64(),
                    "sleeping"
                );
                if self.sleep_or_shutdown().await {
                    DriverState::Stopped
                } else {
                    DriverState::FetchingPage { url: resume_url }
                }
            }

            DriverState::Stopped => DriverState::Stopped,
        };

        &self.state
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Wait out the interval. Returns true if shutdown fired meanwhile.
    async fn sleep_or_shutdown(&mut self) -> bool {
        let sleep = tokio::time::sleep(self.config.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = self.shutdown.changed() => match changed {
                    Ok(()) if *self.shutdown.borrow() => return true,
                    Ok(()) => continue,
                    // Sender gone: nobody can ask us to stop any more
                    Err(_) => {
                        (&mut sleep).await;
                        return false;
                    }
                },
            }
        }
    }

    fn page_done(&mut self, url: &str, persisted: usize, inserted: usize) {
        self.page.pages = 1;
        self.page.inserted = inserted;
        self.page.duplicates = persisted.saturating_sub(inserted);
        self.stats.absorb(&self.page);
        info!(
            url,
            records = persisted,
            inserted,
            skipped = self.page.duplicates,
            "page harvested"
        );
    }

    fn page_failed(&mut self, url: String, err: PipelineError) -> DriverState {
        self.stats.page_failures += 1;
        warn!(
            stage = %err.stage(),
            url = %url,
            error = %err,
            retry_in_secs = self.config.interval.as_secs(),
            "page failed, will retry"
        );
        DriverState::Sleeping {
            resume_url: url,
            reason: SleepReason::StageFailed(err.stage()),
        }
    }

    fn traversal_done(&mut self) -> DriverState {
        let stats = std::mem::take(&mut self.stats);
        stats.log_summary();
        self.last_traversal = Some(stats);
        DriverState::Sleeping {
            resume_url: self.config.start_url.clone(),
            reason: SleepReason::EndOfCatalog,
        }
    }
}
