//! Error types for calendar settings.

use std::path::PathBuf;

/// Result type alias for settings operations.
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Errors that can occur while loading, saving or validating settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// TOML parsing error.
    #[error("failed to parse calendar settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize calendar settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// File I/O error.
    #[error("failed to access settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A field holds a value the calendar cannot use.
    #[error("invalid value for setting '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl SettingsError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
