//! Sync completion cache
//!
//! Remembers which packages have already been synced so that repeated runs
//! can skip them. The cache is a single JSON file inside the cache directory:
//!
//! ```json
//! { "packages": ["a", "b"], "timestamp": "2024-01-01T00:00:00Z" }
//! ```
//!
//! The store is best-effort. Read failures yield an empty set and write
//! failures are logged, so the cache never aborts a run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::CacheError;

/// File name of the cache inside the cache directory
pub const CACHE_FILE_NAME: &str = "synced-packages.json";

/// On-disk representation of the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCache {
    packages: Vec<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Handle to the cache file in a directory
#[derive(Debug, Clone)]
pub struct SyncCache {
    dir: PathBuf,
}

impl SyncCache {
    /// Creates a cache handle rooted at `dir`
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the full path of the cache file
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// Loads the set of synced packages
    ///
    /// A missing, unreadable or corrupt file yields an empty set.
    pub async fn load(&self) -> BTreeSet<String> {
        match self.try_load().await {
            Ok(packages) => {
                debug!(
                    path = %self.file_path().display(),
                    count = packages.len(),
                    "Loaded sync cache"
                );
                packages
            }
            Err(e) => {
                debug!(
                    path = %self.file_path().display(),
                    error = %e,
                    "Sync cache unavailable, starting empty"
                );
                BTreeSet::new()
            }
        }
    }

    /// Persists the set of synced packages
    ///
    /// Failures are logged as warnings and otherwise ignored.
    pub async fn save(&self, packages: &BTreeSet<String>) {
        if let Err(e) = self.try_save(packages).await {
            warn!(
                path = %self.file_path().display(),
                error = %e,
                "Failed to save sync cache"
            );
        }
    }

    /// Loads the cache, reporting why it could not be read
    pub async fn try_load(&self) -> Result<BTreeSet<String>, CacheError> {
        let content = fs::read_to_string(self.file_path()).await?;
        let stored: StoredCache = serde_json::from_str(&content)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(stored.packages.into_iter().collect())
    }

    /// Writes the cache, creating the directory if needed
    pub async fn try_save(&self, packages: &BTreeSet<String>) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;

        let stored = StoredCache {
            packages: packages.iter().cloned().collect(),
            timestamp: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        fs::write(self.file_path(), json).await?;
        debug!(
            path = %self.file_path().display(),
            count = packages.len(),
            "Saved sync cache"
        );
        Ok(())
    }
}
