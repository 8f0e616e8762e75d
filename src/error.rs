//! Application error types for mirror-sync
//!
//! This module defines the error types shared by the sync engine, the cache
//! store and manifest discovery. All error types use `thiserror`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::sync::http_client::HttpError;

/// Reason a single package sync attempt failed
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncErrorKind {
    /// Mirror answered with a non-2xx status
    #[error("{}", status_message(*status, body.as_deref()))]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if the mirror sent one
        body: Option<String>,
    },

    /// DNS, connection or TLS failure
    #[error("{0}")]
    Transport(String),

    /// Request did not complete within the configured timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// The before-sync hook rejected the package
    #[error("{0}")]
    Hook(String),
}

fn status_message(status: u16, body: Option<&str>) -> String {
    match body {
        Some(body) if !body.is_empty() => format!("HTTP {}: {}", status, body),
        _ => format!("HTTP {}", status),
    }
}

/// Failure to sync one package
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Failed to sync {package}: {kind}")]
pub struct SyncError {
    /// Package that failed
    pub package: String,
    /// What went wrong
    pub kind: SyncErrorKind,
}

impl SyncError {
    /// Create a new sync error for a package
    pub fn new(package: impl Into<String>, kind: SyncErrorKind) -> Self {
        Self {
            package: package.into(),
            kind,
        }
    }

    /// Returns true if the error was caused by the request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, SyncErrorKind::Timeout(_))
    }
}

/// A package that was still failing after all retries
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFailure {
    /// Package name
    pub package: String,
    /// Last error seen for the package
    pub error: SyncError,
}

/// One or more packages failed to sync
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Failed to sync {} package(s)", .failures.len())]
pub struct AggregateSyncFailure {
    /// Failures in settlement order
    pub failures: Vec<PackageFailure>,
}

impl AggregateSyncFailure {
    /// Number of packages that failed
    pub fn count(&self) -> usize {
        self.failures.len()
    }

    /// Names of the packages that failed
    pub fn packages(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.package.as_str()).collect()
    }
}

/// Cache-related errors
///
/// These never abort a sync run; the cache store logs and swallows them.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error during cache operation
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Manifest discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// An ignore pattern is not a valid glob
    #[error("Invalid ignore pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },

    /// The workspace root could not be read
    #[error("Failed to read workspace directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Application-level error type
///
/// This is the error returned by the public entry points. It aggregates all
/// domain-specific error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration or target validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Manifest discovery error
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// HTTP client could not be built
    #[error(transparent)]
    Http(#[from] HttpError),

    /// One or more packages failed to sync
    #[error(transparent)]
    Sync(#[from] AggregateSyncFailure),
}
