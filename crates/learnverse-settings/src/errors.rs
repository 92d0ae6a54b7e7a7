//! Why settings could not be produced.

use std::path::PathBuf;

use thiserror::Error;

/// A settings failure. Each variant names what to fix.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not JSON, or does not fit the settings shape.
    #[error("bad settings in {}: {source}", path.display())]
    Json {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A value the bot cannot start without is empty.
    #[error("{key} is required (set {env})")]
    Missing {
        /// Settings key, dotted camelCase.
        key: &'static str,
        /// Environment variable that supplies it.
        env: &'static str,
    },
    /// A value is present but unusable.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
