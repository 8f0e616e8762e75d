//! Supported mirror targets
//!
//! Every public entry point validates the requested target with
//! [`assert_sync_target`] before doing any I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Identifiers accepted for the `target` option
pub const SUPPORTED_TARGETS: &[&str] = &["npmmirror"];

/// Mirror that packages are synced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncTarget {
    /// npmmirror.com
    #[serde(rename = "npmmirror")]
    NpmMirror,
}

impl SyncTarget {
    /// Identifier used in configuration and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            SyncTarget::NpmMirror => "npmmirror",
        }
    }

    /// Registry host that accepts sync requests for this target
    pub fn default_registry(self) -> &'static str {
        match self {
            SyncTarget::NpmMirror => "registry-direct.npmmirror.com",
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npmmirror" => Ok(SyncTarget::NpmMirror),
            _ => Err(ConfigError::InvalidTarget),
        }
    }
}

/// Check that `target` names a supported mirror
pub fn assert_sync_target(target: Option<&str>) -> Result<SyncTarget, ConfigError> {
    match target {
        Some(value) => value.parse(),
        None => Err(ConfigError::InvalidTarget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_target() {
        assert_eq!(
            assert_sync_target(Some("npmmirror")).unwrap(),
            SyncTarget::NpmMirror
        );
    }

    #[test]
    fn test_missing_or_unknown_target() {
        for target in [None, Some(""), Some("invalid"), Some("NPMMIRROR")] {
            let err = assert_sync_target(target).unwrap_err();
            assert_eq!(err, ConfigError::InvalidTarget);
            assert_eq!(
                err.to_string(),
                "Required option target to be one of npmmirror"
            );
        }
    }

    #[test]
    fn test_every_supported_target_parses() {
        for name in SUPPORTED_TARGETS {
            let target: SyncTarget = name.parse().unwrap();
            assert_eq!(target.as_str(), *name);
        }
    }

    #[test]
    fn test_default_registry() {
        assert_eq!(
            SyncTarget::NpmMirror.default_registry(),
            "registry-direct.npmmirror.com"
        );
    }
}
