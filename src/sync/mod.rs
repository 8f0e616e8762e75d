//! Package sync engine
//!
//! This module triggers the mirror to pull packages from the upstream
//! registry, with retries, bounded concurrency and an optional completion
//! cache.
//!
//! # Components
//!
//! - [`http_client`]: Injectable HTTP transport for sync requests
//! - [`client`]: Single-package sync against the mirror endpoint
//! - [`retry`]: Exponential backoff retries and lifecycle hooks
//! - [`runner`]: Bounded-concurrency batch runner
//! - [`progress`]: Progress events and observers
//!
//! # Example
//!
//! ```ignore
//! use mirror_sync::config::SyncConfig;
//! use mirror_sync::sync::{MirrorClient, SyncRunner};
//!
//! let config = SyncConfig::for_target("npmmirror");
//! let client = MirrorClient::from_config(&config)?;
//! let report = SyncRunner::new(client, &config)?
//!     .run(["lodash", "react"])
//!     .await?;
//! ```

pub mod client;
pub mod hooks;
pub mod http_client;
pub mod progress;
pub mod retry;
pub mod runner;

// Re-export main types for convenience
pub use client::{MirrorClient, PackageSyncer};
pub use hooks::{HookError, PostSync, PreSync, SyncHooks};
pub use http_client::{HttpError, HttpResponse, HttpTransport, ReqwestTransport};
pub use progress::{LoggingReporter, ProgressObserver, SilentReporter, SyncProgress};
pub use retry::RetryPolicy;
pub use runner::{SyncReport, SyncRunner};
