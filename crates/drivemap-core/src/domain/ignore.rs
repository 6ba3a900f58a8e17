//! Ignore rules
//!
//! An [`IgnoreMatcher`] holds regular expressions anchored to a base
//! directory: rule `foo/.*\.tmp` under `/sync` matches exactly the absolute
//! paths matched by `/sync/foo/.*\.tmp`. A matcher may point at a
//! process-wide global matcher; anything the global matcher ignores is
//! ignored everywhere, local rules can only add to it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while building an ignore matcher
#[derive(Debug, Error)]
pub enum IgnoreError {
    /// A rule is not a valid regular expression
    #[error("Invalid ignore rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// The rules file could not be read
    #[error("Failed to read ignore rules: {0}")]
    Io(#[from] std::io::Error),

    /// Base directory is unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Path exclusion rules anchored to a base directory
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    base_dir: PathBuf,
    rules: Vec<Regex>,
    global: Option<Arc<IgnoreMatcher>>,
}

impl IgnoreMatcher {
    /// Builds a matcher from rules relative to `base_dir`
    ///
    /// Blank rules and rules starting with `#` are skipped.
    ///
    /// # Errors
    /// - `InvalidArgument` if `base_dir` is not absolute
    /// - `InvalidPattern` on the first rule that does not compile
    pub fn new<S: AsRef<str>>(base_dir: impl Into<PathBuf>, rules: &[S]) -> Result<Self, IgnoreError> {
        let base_dir = base_dir.into();
        if !base_dir.is_absolute() {
            return Err(IgnoreError::InvalidArgument(format!(
                "Ignore base directory must be absolute: {}",
                base_dir.display()
            )));
        }

        let prefix = regex::escape(&base_dir.display().to_string());
        let prefix = prefix.trim_end_matches('/');
        let rules = rules
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim_end)
            .filter(|rule| !rule.is_empty() && !rule.starts_with('#'))
            .map(|rule| {
                Regex::new(&format!("^{prefix}/(?:{rule})$")).map_err(|source| {
                    IgnoreError::InvalidPattern {
                        rule: rule.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(base = %base_dir.display(), rules = rules.len(), "Built ignore matcher");

        Ok(Self {
            base_dir,
            rules,
            global: None,
        })
    }

    /// A matcher with no local rules
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `base_dir` is not absolute
    pub fn empty(base_dir: impl Into<PathBuf>) -> Result<Self, IgnoreError> {
        Self::new::<&str>(base_dir, &[])
    }

    /// Loads newline-delimited rules; the file's directory becomes the base
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `InvalidArgument` if the file path has no absolute parent directory
    /// - `InvalidPattern` on an invalid rule
    pub fn from_rules_file(path: &Path) -> Result<Self, IgnoreError> {
        let base_dir = path
            .parent()
            .filter(|p| p.is_absolute())
            .ok_or_else(|| {
                IgnoreError::InvalidArgument(format!(
                    "Rules file must have an absolute parent directory: {}",
                    path.display()
                ))
            })?
            .to_path_buf();
        let contents = fs::read_to_string(path)?;
        let rules: Vec<&str> = contents.lines().collect();
        Self::new(base_dir, &rules)
    }

    /// Consults `global` in addition to this matcher's own rules
    #[must_use]
    pub fn with_global(mut self, global: Arc<IgnoreMatcher>) -> Self {
        self.global = Some(global);
        self
    }

    /// Base directory the rules are anchored to
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of local rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Whether `path` is excluded by a local rule or by the global matcher
    ///
    /// Relative paths are resolved against the base directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let absolute;
        let path = if path.is_absolute() {
            path
        } else {
            absolute = self.base_dir.join(path);
            absolute.as_path()
        };

        if self.global.as_ref().is_some_and(|g| g.is_ignored(path)) {
            return true;
        }

        let text = path.to_string_lossy();
        self.rules.iter().any(|rule| rule.is_match(&text))
    }
}
