//! mirror-sync - Sync workspace npm packages to a registry mirror
//!
//! This crate finds the publishable packages in a workspace and asks a
//! mirror (npmmirror) to pull their latest releases from the upstream
//! registry, with retries, bounded concurrency and an optional completion
//! cache.
//!
//! # Example
//!
//! ```ignore
//! use mirror_sync::config::SyncConfig;
//!
//! let config = SyncConfig::for_target("npmmirror");
//! let report = mirror_sync::sync_packages(["lodash", "react"], &config).await?;
//! println!("synced {} package(s)", report.synced.len());
//! ```

use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod sync;
pub mod target;

pub use config::{Config, DiscoveryConfig, SyncConfig};
pub use discovery::discover_package_names;
pub use error::{AggregateSyncFailure, AppError, PackageFailure, SyncError, SyncErrorKind};
pub use sync::{MirrorClient, SyncReport, SyncRunner};
pub use target::{assert_sync_target, SyncTarget, SUPPORTED_TARGETS};

use sync::LoggingReporter;

/// Sync the given packages to the configured mirror
///
/// The target is validated before any request is made. Progress is logged
/// through `tracing`; use [`SyncRunner`] directly for hooks or a custom
/// observer.
pub async fn sync_packages<I, P>(packages: I, config: &SyncConfig) -> Result<SyncReport, AppError>
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    assert_sync_target(config.target.as_deref())?;

    let client = MirrorClient::from_config(config)?;
    let report = SyncRunner::new(client, config)?
        .with_observer(Arc::new(LoggingReporter))
        .run(packages)
        .await?;

    Ok(report)
}

/// Discover the workspace packages and sync them
pub async fn sync_packages_auto(config: &Config) -> Result<SyncReport, AppError> {
    assert_sync_target(config.sync.target.as_deref())?;

    let packages = discover_package_names(&config.discovery)?;
    sync_packages(packages, &config.sync).await
}
