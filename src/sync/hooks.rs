//! Lifecycle hooks around each package sync

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::SyncError;

/// Error returned by a before-sync hook
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Runs before the first attempt for a package
///
/// Returning an error fails the package without any network request.
#[async_trait]
pub trait PreSync: Send + Sync {
    async fn before_sync(&self, package: &str) -> Result<(), HookError>;
}

/// Runs once a package has settled
///
/// `error` is `None` on success and carries the terminal error otherwise.
#[async_trait]
pub trait PostSync: Send + Sync {
    async fn after_sync(&self, package: &str, error: Option<&SyncError>);
}

/// Optional pair of lifecycle hooks
#[derive(Clone, Default)]
pub struct SyncHooks {
    pub before: Option<Arc<dyn PreSync>>,
    pub after: Option<Arc<dyn PostSync>>,
}

impl SyncHooks {
    /// No hooks
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_before(mut self, hook: Arc<dyn PreSync>) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn with_after(mut self, hook: Arc<dyn PostSync>) -> Self {
        self.after = Some(hook);
        self
    }

    pub(crate) async fn run_before(&self, package: &str) -> Result<(), HookError> {
        match &self.before {
            Some(hook) => hook.before_sync(package).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn run_after(&self, package: &str, error: Option<&SyncError>) {
        if let Some(hook) = &self.after {
            hook.after_sync(package, error).await;
        }
    }
}

impl fmt::Debug for SyncHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}
