//! Bounded-concurrency sync runner
//!
//! Drives [`RetryPolicy::sync_with_retry`] across a batch of packages with at
//! most `concurrency` packages in flight. The runner's loop is the only owner
//! of the cache set and the outcome lists; it updates them as each package
//! settles, so nothing is shared between in-flight syncs.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

use crate::cache::SyncCache;
use crate::config::{ConfigError, SyncConfig};
use crate::error::{AggregateSyncFailure, PackageFailure, SyncError};
use crate::sync::client::PackageSyncer;
use crate::sync::hooks::SyncHooks;
use crate::sync::progress::{ProgressObserver, SilentReporter, SyncProgress};
use crate::sync::retry::RetryPolicy;
use crate::target::{assert_sync_target, SyncTarget};

/// Outcome of a batch in which every package succeeded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Packages synced in this run, in settlement order
    pub synced: Vec<String>,
    /// Packages skipped because the cache already listed them
    pub skipped: usize,
}

/// Runs a batch of package syncs
pub struct SyncRunner<S: PackageSyncer> {
    syncer: S,
    target: SyncTarget,
    policy: RetryPolicy,
    concurrency: usize,
    cache: Option<SyncCache>,
    hooks: SyncHooks,
    observer: Arc<dyn ProgressObserver>,
}

impl<S: PackageSyncer> SyncRunner<S> {
    /// Create a runner for `config`
    ///
    /// Fails if the configured target is missing or unsupported. A
    /// concurrency below 1 is treated as 1.
    pub fn new(syncer: S, config: &SyncConfig) -> Result<Self, ConfigError> {
        let target = assert_sync_target(config.target.as_deref())?;

        Ok(Self {
            syncer,
            target,
            policy: RetryPolicy::from_config(config),
            concurrency: config.concurrency.max(1),
            cache: config.cache.then(|| SyncCache::new(config.cache_dir.clone())),
            hooks: SyncHooks::none(),
            observer: Arc::new(SilentReporter),
        })
    }

    /// Attach lifecycle hooks
    pub fn with_hooks(mut self, hooks: SyncHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Attach a progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn target(&self) -> SyncTarget {
        self.target
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Sync every package in `packages`
    ///
    /// Duplicate names are synced once. Returns the report when every
    /// package succeeded, otherwise every failure in settlement order.
    pub async fn run<I, P>(&self, packages: I) -> Result<SyncReport, AggregateSyncFailure>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = packages
            .into_iter()
            .map(Into::into)
            .filter(|name| seen.insert(name.clone()))
            .collect();

        let mut cached = match &self.cache {
            Some(cache) => cache.load().await,
            None => BTreeSet::new(),
        };
        let initial_cached = cached.len();

        let pending: Vec<String> = unique
            .iter()
            .filter(|name| !cached.contains(*name))
            .cloned()
            .collect();
        let skipped = unique.len() - pending.len();

        if skipped > 0 {
            self.observer
                .on_event(&SyncProgress::SkippedCached { count: skipped });
        }
        if pending.is_empty() {
            if skipped > 0 {
                self.observer.on_event(&SyncProgress::AllCached);
            }
            return Ok(SyncReport {
                synced: Vec::new(),
                skipped,
            });
        }

        let total = pending.len();
        info!(
            mirror = %self.target,
            total = total,
            skipped = skipped,
            concurrency = self.concurrency,
            "Starting package sync"
        );
        self.observer.on_event(&SyncProgress::Starting {
            total,
            concurrency: self.concurrency,
        });

        let mut queue = pending.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut synced = Vec::new();
        let mut failures = Vec::new();
        let mut completed = 0;

        loop {
            while in_flight.len() < self.concurrency {
                match queue.next() {
                    Some(package) => in_flight.push(self.sync_one(package)),
                    None => break,
                }
            }

            let Some((package, result)) = in_flight.next().await else {
                break;
            };
            completed += 1;

            match result {
                Ok(()) => {
                    if self.cache.is_some() {
                        cached.insert(package.clone());
                    }
                    self.observer.on_event(&SyncProgress::PackageSynced {
                        package: package.clone(),
                        completed,
                        total,
                    });
                    synced.push(package);
                }
                Err(error) => {
                    self.observer.on_event(&SyncProgress::PackageFailed {
                        package: package.clone(),
                        error: error.to_string(),
                        completed,
                        total,
                    });
                    failures.push(PackageFailure { package, error });
                }
            }
        }

        if let Some(cache) = &self.cache {
            if cached.len() > initial_cached {
                cache.save(&cached).await;
            } else {
                debug!("Sync cache unchanged, not saving");
            }
        }

        self.observer.on_event(&SyncProgress::Finished {
            succeeded: synced.len(),
            failures: failures
                .iter()
                .map(|f: &PackageFailure| (f.package.clone(), f.error.to_string()))
                .collect(),
        });

        if failures.is_empty() {
            info!(synced = synced.len(), "Package sync complete");
            Ok(SyncReport { synced, skipped })
        } else {
            Err(AggregateSyncFailure { failures })
        }
    }

    async fn sync_one(&self, package: String) -> (String, Result<(), SyncError>) {
        let result = self
            .policy
            .sync_with_retry(&package, &self.syncer, &self.hooks)
            .await;
        (package, result)
    }
}
