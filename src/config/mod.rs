//! Configuration management for mirror-sync
//!
//! Configuration is merged from three layers, lowest precedence first:
//!
//! 1. a config file in the working directory (`sync.config.*`, `.syncrc*`,
//!    or the `sync` key of `package.json`)
//! 2. `MIRROR_SYNC_*` environment variables
//! 3. explicit invocation parameters ([`ConfigOverrides`], usually CLI flags)
//!
//! The result is an immutable [`Config`] that is read-only for the duration
//! of a sync run.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::target::SUPPORTED_TARGETS;

/// Config file names searched in the working directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "sync.config.yaml",
    "sync.config.yml",
    "sync.config.json",
    ".syncrc",
    ".syncrc.json",
    ".syncrc.yaml",
    ".syncrc.yml",
];

/// Manifest whose `sync` key is used when no config file exists
const PACKAGE_JSON: &str = "package.json";

/// Main application configuration
///
/// The file format is flat: sync and discovery options live side by side at
/// the top level, matching the command line flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Sync engine configuration
    #[serde(flatten)]
    pub sync: SyncConfig,

    /// Manifest discovery configuration
    #[serde(flatten)]
    pub discovery: DiscoveryConfig,

    /// Only print the packages that would be synced
    #[serde(default)]
    pub dry: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    ///
    /// `package.json` files are read through their `sync` key; every other
    /// file is parsed as YAML (which also accepts JSON).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(format!("{}: {}", path.display(), e)))?;

        if path.file_name().and_then(|n| n.to_str()) == Some(PACKAGE_JSON) {
            return Ok(Self::from_package_json(&content)?.unwrap_or_default());
        }
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML (or JSON) string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Extract configuration from the `sync` key of a `package.json`
    ///
    /// Returns `Ok(None)` when the manifest has no `sync` key.
    pub fn from_package_json(content: &str) -> Result<Option<Self>, ConfigError> {
        let manifest: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse package.json: {}", e)))?;

        match manifest.get("sync") {
            Some(section) => serde_json::from_value(section.clone())
                .map(Some)
                .map_err(|e| ConfigError::Parse(format!("Invalid sync section: {}", e))),
            None => Ok(None),
        }
    }

    /// Find the first config file present in `dir`
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the file layer for `dir`
    ///
    /// An explicit path must exist. Without one, the search order in
    /// [`CONFIG_FILE_NAMES`] is used, then `package.json`, and finally the
    /// defaults.
    pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = Self::find_config_file(dir) {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            return Self::from_file(path);
        }

        let manifest = dir.join(PACKAGE_JSON);
        if manifest.is_file() {
            // A broken workspace manifest is discovery's problem, not ours
            if let Ok(content) = std::fs::read_to_string(&manifest) {
                if let Ok(Some(config)) = Self::from_package_json(&content) {
                    tracing::debug!(path = %manifest.display(), "Loading configuration from package.json");
                    return Ok(config);
                }
            }
        }

        Ok(Self::default())
    }

    /// Apply `MIRROR_SYNC_*` environment variables
    pub fn apply_env(mut self) -> Self {
        if let Ok(target) = std::env::var("MIRROR_SYNC_TARGET") {
            self.sync.target = Some(target);
        }
        if let Ok(registry) = std::env::var("MIRROR_SYNC_REGISTRY") {
            self.sync.registry = Some(registry);
        }
        if let Ok(dir) = std::env::var("MIRROR_SYNC_CACHE_DIR") {
            self.sync.cache_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("MIRROR_SYNC_LOG_LEVEL") {
            self.logging.level = level;
        }
        self
    }

    /// Apply explicit invocation parameters; set values always win
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        let sync = &mut self.sync;
        if let Some(target) = &overrides.target {
            sync.target = Some(target.clone());
        }
        if let Some(registry) = &overrides.registry {
            sync.registry = Some(registry.clone());
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            sync.timeout_ms = timeout_ms;
        }
        if let Some(retry) = overrides.retry {
            sync.retry = retry;
        }
        if let Some(retry_delay_ms) = overrides.retry_delay_ms {
            sync.retry_delay_ms = retry_delay_ms;
        }
        if let Some(concurrency) = overrides.concurrency {
            sync.concurrency = concurrency;
        }
        if let Some(cache) = overrides.cache {
            sync.cache = cache;
        }
        if let Some(cache_dir) = &overrides.cache_dir {
            sync.cache_dir = cache_dir.clone();
        }
        if let Some(verbose) = overrides.verbose {
            sync.verbose = verbose;
        }
        if let Some(silent) = overrides.silent {
            sync.silent = silent;
        }
        if let Some(debug) = overrides.debug {
            sync.debug = debug;
        }

        let discovery = &mut self.discovery;
        if let Some(cwd) = &overrides.cwd {
            discovery.cwd = Some(cwd.clone());
        }
        if let Some(ignore) = &overrides.ignore {
            discovery.ignore = ignore.clone();
        }
        if let Some(default_ignore) = overrides.default_ignore {
            discovery.default_ignore = default_ignore;
        }
        if let Some(include) = &overrides.include {
            discovery.include = include.clone();
        }
        if let Some(exclude) = &overrides.exclude {
            discovery.exclude = exclude.clone();
        }
        if let Some(with_optional) = overrides.with_optional {
            discovery.with_optional = with_optional;
        }

        if let Some(dry) = overrides.dry {
            self.dry = dry;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = &overrides.log_format {
            self.logging.format = format.clone();
        }
        self
    }

    /// Check values that would make a run meaningless
    ///
    /// The target is not checked here; it is validated at each
    /// public entry point instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if !matches!(
            self.logging.format.as_str(),
            "compact" | "pretty" | "json"
        ) {
            return Err(ConfigError::InvalidValue(format!(
                "unknown log format '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}

/// Resolve the configuration for one invocation
///
/// Merges the file found in `dir` (or `explicit`), the environment and the
/// overrides, then validates the result. A relative `cwd` from the file is
/// taken relative to `dir`.
pub fn resolve_config(
    dir: &Path,
    explicit: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    let mut config = Config::load(dir, explicit)?;
    if let Some(cwd) = &mut config.discovery.cwd {
        if cwd.is_relative() {
            *cwd = dir.join(cwd.as_path());
        }
    }

    let config = config.apply_env().apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Mirror identifier, validated at each entry point
    #[serde(default)]
    pub target: Option<String>,

    /// Registry host override
    #[serde(default)]
    pub registry: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms", rename = "timeout")]
    pub timeout_ms: u64,

    /// Number of retries after the first attempt
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Base backoff delay in milliseconds
    #[serde(default = "default_retry_delay_ms", rename = "retryDelay")]
    pub retry_delay_ms: u64,

    /// Maximum number of requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whether to skip packages recorded in the sync cache
    #[serde(default)]
    pub cache: bool,

    /// Directory holding the sync cache file
    #[serde(default = "default_cache_dir", rename = "cacheDir")]
    pub cache_dir: PathBuf,

    /// Print one line per package instead of a progress bar
    #[serde(default)]
    pub verbose: bool,

    /// Suppress all progress output
    #[serde(default)]
    pub silent: bool,

    /// Log every attempt
    #[serde(default)]
    pub debug: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target: None,
            registry: None,
            timeout_ms: default_timeout_ms(),
            retry: default_retry(),
            retry_delay_ms: default_retry_delay_ms(),
            concurrency: default_concurrency(),
            cache: false,
            cache_dir: default_cache_dir(),
            verbose: false,
            silent: false,
            debug: false,
        }
    }
}

impl SyncConfig {
    /// Convenience constructor for a config targeting `target`
    pub fn for_target(target: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            ..Default::default()
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_concurrency() -> usize {
    5
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".sync-cache")
}

/// Manifest discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Workspace root; defaults to the current directory
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra glob patterns of manifests to ignore
    #[serde(default, deserialize_with = "one_or_many")]
    pub ignore: Vec<String>,

    /// Apply the built-in ignore patterns
    #[serde(default = "default_true", rename = "defaultIgnore")]
    pub default_ignore: bool,

    /// Package names to sync in addition to the discovered ones
    #[serde(default, deserialize_with = "one_or_many")]
    pub include: Vec<String>,

    /// Package names never to sync
    #[serde(default, deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,

    /// Also sync each manifest's optionalDependencies
    #[serde(default, rename = "withOptional")]
    pub with_optional: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            ignore: Vec::new(),
            default_ignore: default_true(),
            include: Vec::new(),
            exclude: Vec::new(),
            with_optional: false,
        }
    }
}

impl DiscoveryConfig {
    /// Discovery rooted at `cwd` with default settings
    pub fn in_dir<P: Into<PathBuf>>(cwd: P) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Default::default()
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: compact, pretty or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

/// Explicit invocation parameters
///
/// Every field left as `None` keeps the value from the lower layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub target: Option<String>,
    pub registry: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retry: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub cache: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub silent: Option<bool>,
    pub debug: Option<bool>,
    pub cwd: Option<PathBuf>,
    pub ignore: Option<Vec<String>>,
    pub default_ignore: Option<bool>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub with_optional: Option<bool>,
    pub dry: Option<bool>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Target missing or not supported
    #[error("Required option target to be one of {}", SUPPORTED_TARGETS.join(", "))]
    InvalidTarget,

    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Accept either a single string or a list of strings
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax; unknown variables are left untouched.
fn expand_env_vars(input: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return input.to_string();
    };

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
