//! Workspace manifest discovery
//!
//! Walks a workspace for `package.json` files and collects the names of the
//! packages that can be published. Directories matched by an ignore pattern
//! ending in `/**` are pruned instead of walked.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;

/// Manifest file name
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Always ignored, even without the default ignores
pub const IGNORE_NODE_MODULES: &str = "**/node_modules/**";

/// Ignored unless `default_ignore` is turned off
pub const DEFAULT_IGNORE: &[&str] = &[
    IGNORE_NODE_MODULES,
    "**/.git/**",
    "**/docs/**",
    "**/tests/**",
    "**/examples/**",
    "**/fixtures/**",
    "**/playground/**",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// The parts of a `package.json` discovery cares about
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, serde_json::Value>,
}

impl PackageManifest {
    /// Parse a manifest from JSON text
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// True for non-private manifests with a non-empty name and version
    pub fn is_valid_public(&self) -> bool {
        if self.private {
            return false;
        }
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.name) && present(&self.version)
    }
}

/// Compiled set of ignore patterns
#[derive(Debug, Clone)]
struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    fn new(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let mut raw: Vec<&str> = config.ignore.iter().map(String::as_str).collect();
        if config.default_ignore {
            raw.extend_from_slice(DEFAULT_IGNORE);
        } else {
            raw.push(IGNORE_NODE_MODULES);
        }

        let patterns = raw
            .into_iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| DiscoveryError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// True if `rel_path` (slash separated) is ignored
    fn is_ignored(&self, rel_path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
    }

    /// True if everything below the directory `rel_dir` is ignored
    fn prunes_dir(&self, rel_dir: &str) -> bool {
        let probe = format!("{}/{}", rel_dir, MANIFEST_FILE_NAME);
        self.patterns
            .iter()
            .filter(|p| p.as_str().ends_with("/**"))
            .any(|p| p.matches_with(&probe, MATCH_OPTIONS))
    }
}

/// Find the manifests under `root`, in sorted path order
///
/// Returns absolute (root-joined) paths.
pub fn find_manifests(root: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>, DiscoveryError> {
    let ignore = IgnoreSet::new(config)?;
    let mut manifests = Vec::new();

    // The root itself must be readable; failures below it are only logged
    let entries = sorted_entries(root)?;
    walk(root, "", entries, &ignore, &mut manifests);

    Ok(manifests)
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn walk(
    dir: &Path,
    rel_dir: &str,
    entries: Vec<fs::DirEntry>,
    ignore: &IgnoreSet,
    manifests: &mut Vec<PathBuf>,
) {
    let mut subdirs = Vec::new();

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        let rel_path = if rel_dir.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", rel_dir, name)
        };

        // file_type does not follow symlinks, so linked directories are not walked
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if name.starts_with('.') || ignore.prunes_dir(&rel_path) {
                debug!(dir = %rel_path, "Skipping directory");
                continue;
            }
            subdirs.push((entry.path(), rel_path));
        } else if name == MANIFEST_FILE_NAME && is_regular_file(&entry, file_type) {
            if !ignore.is_ignored(&rel_path) {
                manifests.push(dir.join(&name));
            }
        }
    }

    for (path, rel_path) in subdirs {
        match sorted_entries(&path) {
            Ok(entries) => walk(&path, &rel_path, entries, ignore, manifests),
            Err(e) => warn!(dir = %path.display(), error = %e, "Failed to read directory"),
        }
    }
}

/// Regular files, or symlinks resolving to one
fn is_regular_file(entry: &fs::DirEntry, file_type: fs::FileType) -> bool {
    file_type.is_file()
        || (file_type.is_symlink() && fs::metadata(entry.path()).is_ok_and(|m| m.is_file()))
}

/// Read and parse a manifest, logging and skipping broken ones
fn read_manifest(path: &Path) -> Option<PackageManifest> {
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| PackageManifest::from_json(&content).map_err(|e| e.to_string()));

    match parsed {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse manifest");
            None
        }
    }
}

/// Collect the package names to sync for a workspace
///
/// The result starts with `include`, followed by each valid manifest's name
/// (and its optional dependencies when `with_optional` is set), with
/// `exclude` removed and duplicates dropped.
pub fn discover_package_names(config: &DiscoveryConfig) -> Result<Vec<String>, DiscoveryError> {
    let root = match &config.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };

    let manifests = find_manifests(&root, config)?;
    debug!(root = %root.display(), count = manifests.len(), "Found manifests");

    let mut names = config.include.clone();
    for manifest in manifests.iter().filter_map(|path| read_manifest(path)) {
        if !manifest.is_valid_public() {
            continue;
        }
        if let Some(name) = manifest.name {
            names.push(name);
        }
        if config.with_optional {
            names.extend(manifest.optional_dependencies.into_keys());
        }
    }

    let excluded: HashSet<&str> = config.exclude.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    Ok(names
        .into_iter()
        .filter(|name| !excluded.contains(name.as_str()))
        .filter(|name| seen.insert(name.clone()))
        .collect())
}
