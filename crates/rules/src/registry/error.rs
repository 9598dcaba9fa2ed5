//! Error types and load result structures for the plugin loader.

use std::path::PathBuf;

/// Errors raised while registering rules or loading plugin manifests.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Manifest validation error (wrong kind, empty id, duplicate module).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A rule key registered twice.
    #[error("rule key '{0}' is already registered")]
    Duplicate(String),
}

/// Result alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

/// Outcome of examining a single file in the plugin directory.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was examined.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single module load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Module loaded; `rules` were activated, `skipped` entries were dropped.
    Loaded {
        plugin_id: String,
        rules: Vec<String>,
        skipped: Vec<String>,
    },
    /// File was not a plugin module (dotfile, initializer, non-YAML, disabled).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}

impl LoadResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, LoadStatus::Failed { .. })
    }
}
