//! Progress events emitted by the sync runner
//!
//! The runner reports what it is doing through a [`ProgressObserver`]. The
//! library ships a silent observer and one that forwards events to
//! `tracing`; the command line binary renders them to the terminal.

use tracing::{info, warn};

/// Event emitted while a batch is running
#[derive(Debug, Clone, PartialEq)]
pub enum SyncProgress {
    /// Packages were skipped because the cache already lists them
    SkippedCached { count: usize },

    /// Every requested package was already cached; nothing will be sent
    AllCached,

    /// Requests are about to start
    Starting { total: usize, concurrency: usize },

    /// A package settled successfully
    PackageSynced {
        package: String,
        completed: usize,
        total: usize,
    },

    /// A package settled with a failure after all retries
    PackageFailed {
        package: String,
        error: String,
        completed: usize,
        total: usize,
    },

    /// Every package has settled
    ///
    /// `failures` holds `(package, error message)` pairs in settlement order.
    Finished {
        succeeded: usize,
        failures: Vec<(String, String)>,
    },
}

/// Receives progress events from the runner
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &SyncProgress);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressObserver for SilentReporter {
    fn on_event(&self, _event: &SyncProgress) {}
}

/// Observer that logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

impl ProgressObserver for LoggingReporter {
    fn on_event(&self, event: &SyncProgress) {
        match event {
            SyncProgress::SkippedCached { count } => {
                info!(count = count, "Skipping cached packages");
            }
            SyncProgress::AllCached => {
                info!("All packages already synced");
            }
            SyncProgress::Starting { total, concurrency } => {
                info!(total = total, concurrency = concurrency, "Starting sync");
            }
            SyncProgress::PackageSynced {
                package,
                completed,
                total,
            } => {
                info!(package = %package, completed = completed, total = total, "Package synced");
            }
            SyncProgress::PackageFailed {
                package,
                error,
                completed,
                total,
            } => {
                warn!(
                    package = %package,
                    error = %error,
                    completed = completed,
                    total = total,
                    "Package failed"
                );
            }
            SyncProgress::Finished {
                succeeded,
                failures,
            } => {
                if failures.is_empty() {
                    info!(succeeded = succeeded, "Sync finished");
                } else {
                    warn!(
                        succeeded = succeeded,
                        failed = failures.len(),
                        "Sync finished with failures"
                    );
                }
            }
        }
    }
}
