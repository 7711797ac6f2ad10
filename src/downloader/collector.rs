//! Range collection: one fetch per day, paced, in date order

use indicatif::ProgressBar;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::downloader::DateRange;
use crate::fetcher::ApodFetcher;
use crate::metrics::{self, DateOutcome};
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};
use crate::Record;

/// Records gathered for a range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    /// Successful records in ascending date order
    pub records: Vec<Record>,
    /// Dates that produced no record
    pub failed_dates: usize,
    /// Whether collection stopped before the end of the range
    pub interrupted: bool,
}

/// Walks a [`DateRange`] and fetches every day in order.
pub struct RangeCollector {
    fetcher: ApodFetcher,
    request_delay: Duration,
    shutdown: SharedShutdown,
    progress: Option<ProgressBar>,
}

impl RangeCollector {
    /// Create a collector that waits `request_delay` after every date.
    pub fn new(fetcher: ApodFetcher, request_delay: Duration) -> Self {
        Self {
            fetcher,
            request_delay,
            shutdown: ShutdownCoordinator::shared(),
            progress: None,
        }
    }

    /// Share a shutdown coordinator. It should be the same one the fetcher uses.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Tick `progress` once per processed date.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetch every date in `range` and return the records that succeeded.
    ///
    /// Order follows the dates; failed dates are skipped without a
    /// placeholder. A shutdown request stops the walk and returns what was
    /// collected so far; `interrupted` is only set when dates were left
    /// unfetched.
    pub async fn collect(&self, range: &DateRange) -> Collection {
        let mut collection = Collection::default();
        info!(range = %range, days = range.len(), "Collecting APOD entries");

        let mut days = range.days().peekable();
        while let Some(date) = days.next() {
            if self.shutdown.is_shutdown_requested() {
                warn!(
                    collected = collection.records.len(),
                    "Shutdown requested, stopping collection early"
                );
                collection.interrupted = true;
                break;
            }

            let date_str = date.format(crate::DATE_FORMAT).to_string();
            match self.fetcher.fetch(date).await {
                Some(record) => {
                    debug!(date = %date_str, "Collected APOD entry");
                    metrics::record_date_outcome(DateOutcome::Collected);
                    collection.records.push(record);
                }
                // The fetcher gave up because of the shutdown, not the upstream.
                None if self.shutdown.is_shutdown_requested() => {
                    warn!(
                        date = %date_str,
                        collected = collection.records.len(),
                        "Shutdown requested, stopping collection early"
                    );
                    collection.interrupted = true;
                    break;
                }
                None => {
                    error!(date = %date_str, "Error retrieving data for date: {}", date_str);
                    metrics::record_date_outcome(DateOutcome::Failed);
                    collection.failed_dates += 1;
                }
            }

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }

            // Paces every date, including the last one and failures.
            if !self.shutdown.sleep(self.request_delay).await {
                if days.peek().is_some() {
                    warn!(
                        collected = collection.records.len(),
                        "Shutdown requested, stopping collection early"
                    );
                    collection.interrupted = true;
                }
                break;
            }
        }

        info!(
            collected = collection.records.len(),
            failed = collection.failed_dates,
            interrupted = collection.interrupted,
            "Collection finished"
        );
        collection
    }
}
