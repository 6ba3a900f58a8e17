//! Configuration module for drivemap.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::ignore::{IgnoreError, IgnoreMatcher};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivemap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub discovery: DiscoveryConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Mapping roots and ignore rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory the remote root is mirrored into.
    pub local_root: PathBuf,
    /// Remote ID of the folder mapped to `local_root`. `None` until `drivemap init`.
    pub remote_root: Option<String>,
    /// Where the mapping registry is persisted.
    pub map_file: PathBuf,
    /// Optional newline-delimited rules file; its directory is the rule base.
    pub ignore_file: Option<PathBuf>,
    /// Global ignore rules, anchored to `local_root`.
    pub ignore: Vec<String>,
}

/// Discovery engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum depth below the starting folder. `None` means unbounded.
    pub max_depth: Option<usize>,
    /// Traversal order: `dfs` or `bfs`.
    pub traversal: String,
    /// Sync flag of newly found folders: `always`, `never`, `inherit` or `unless_ignored`.
    pub new_folders: String,
    /// Persist the map file every N listed folders (0 = only at the end).
    pub checkpoint_every: usize,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the metadata API.
    pub base_url: String,
    /// Base URL of the media upload API.
    pub upload_base_url: String,
    /// Items requested per listing page.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// How many times a throttled (HTTP 429) request is retried.
    pub max_retries: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivemap/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivemap")
            .join("config.yaml")
    }

    /// Builds the ignore matcher described by the `sync` section.
    ///
    /// The inline `ignore` rules form the global matcher anchored at
    /// `local_root`. When `ignore_file` is set, its rules are layered on top
    /// and the global matcher is still consulted.
    pub fn ignore_matcher(&self) -> Result<Arc<IgnoreMatcher>, IgnoreError> {
        let global = Arc::new(IgnoreMatcher::new(self.sync.local_root.clone(), &self.sync.ignore)?);
        match &self.sync.ignore_file {
            Some(file) => Ok(Arc::new(IgnoreMatcher::from_rules_file(file)?.with_global(global))),
            None => Ok(global),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("drivemap");
        Self {
            local_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Drive"),
            remote_root: None,
            map_file: data_dir.join("map.json"),
            ignore_file: None,
            ignore: vec![r"(?:.*/)?\.git".to_string(), r".*~".to_string()],
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            traversal: "dfs".to_string(),
            new_folders: "unless_ignored".to_string(),
            checkpoint_every: 0,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            page_size: 1000,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.local_root"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `discovery.traversal`.
pub const VALID_TRAVERSALS: &[&str] = &["dfs", "bfs"];

/// Valid values for `discovery.new_folders`.
pub const VALID_NEW_FOLDER_POLICIES: &[&str] = &["always", "never", "inherit", "unless_ignored"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if !self.sync.local_root.is_absolute() {
            errors.push(ValidationError {
                field: "sync.local_root".into(),
                message: format!("must be absolute: {}", self.sync.local_root.display()),
            });
        }
        if !self.sync.map_file.is_absolute() {
            errors.push(ValidationError {
                field: "sync.map_file".into(),
                message: format!("must be absolute: {}", self.sync.map_file.display()),
            });
        }
        if self.sync.remote_root.as_deref().is_some_and(str::is_empty) {
            errors.push(ValidationError {
                field: "sync.remote_root".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(file) = &self.sync.ignore_file {
            if !file.is_absolute() {
                errors.push(ValidationError {
                    field: "sync.ignore_file".into(),
                    message: format!("must be absolute: {}", file.display()),
                });
            }
        }
        for (i, rule) in self.sync.ignore.iter().enumerate() {
            if let Err(e) = regex::Regex::new(rule) {
                errors.push(ValidationError {
                    field: format!("sync.ignore[{i}]"),
                    message: format!("invalid regular expression: {e}"),
                });
            }
        }

        // --- discovery ---
        if !VALID_TRAVERSALS.contains(&self.discovery.traversal.as_str()) {
            errors.push(ValidationError {
                field: "discovery.traversal".into(),
                message: format!(
                    "invalid traversal '{}'; valid options: {}",
                    self.discovery.traversal,
                    VALID_TRAVERSALS.join(", ")
                ),
            });
        }
        if !VALID_NEW_FOLDER_POLICIES.contains(&self.discovery.new_folders.as_str()) {
            errors.push(ValidationError {
                field: "discovery.new_folders".into(),
                message: format!(
                    "invalid policy '{}'; valid options: {}",
                    self.discovery.new_folders,
                    VALID_NEW_FOLDER_POLICIES.join(", ")
                ),
            });
        }

        // --- remote ---
        if self.remote.page_size == 0 || self.remote.page_size > 1000 {
            errors.push(ValidationError {
                field: "remote.page_size".into(),
                message: "must be in range 1..=1000".into(),
            });
        }
        if self.remote.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        for (field, url) in [
            ("remote.base_url", &self.remote.base_url),
            ("remote.upload_base_url", &self.remote.upload_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("must be an http(s) URL: {url}"),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivemap_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_root(PathBuf::from("/home/user/Drive"))
///     .remote_root("0AbCdEf")
///     .max_depth(Some(2))
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn local_root(mut self, root: PathBuf) -> Self {
        self.config.sync.local_root = root;
        self
    }

    pub fn remote_root(mut self, id: impl Into<String>) -> Self {
        self.config.sync.remote_root = Some(id.into());
        self
    }

    pub fn map_file(mut self, path: PathBuf) -> Self {
        self.config.sync.map_file = path;
        self
    }

    pub fn ignore_file(mut self, path: PathBuf) -> Self {
        self.config.sync.ignore_file = Some(path);
        self
    }

    pub fn ignore_rules(mut self, rules: Vec<String>) -> Self {
        self.config.sync.ignore = rules;
        self
    }

    // --- discovery ---

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.discovery.max_depth = depth;
        self
    }

    pub fn traversal(mut self, traversal: impl Into<String>) -> Self {
        self.config.discovery.traversal = traversal.into();
        self
    }

    pub fn new_folders(mut self, policy: impl Into<String>) -> Self {
        self.config.discovery.new_folders = policy.into();
        self
    }

    pub fn checkpoint_every(mut self, folders: usize) -> Self {
        self.config.discovery.checkpoint_every = folders;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.upload_base_url = url.into();
        self
    }

    pub fn remote_page_size(mut self, n: u32) -> Self {
        self.config.remote.page_size = n;
        self
    }

    pub fn remote_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.timeout_secs = seconds;
        self
    }

    pub fn remote_max_retries(mut self, n: u32) -> Self {
        self.config.remote.max_retries = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
