//! Error types for configuration and session operations.

use std::path::PathBuf;

use patchrome_engine::{EngineError, SourceId};
use thiserror::Error;

/// Errors loading or saving an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field is out of range
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors from the attachment lifecycle.
///
/// A failed engage or finalize only affects its own media element; the
/// session keeps serving every other attachment.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Settings JSON is malformed
    #[error("failed to parse settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// Settings file could not be read
    #[error("failed to read settings '{path}': {source}")]
    ReadSettings {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The engine would not wrap the media element
    #[error("failed to attach media element {element}")]
    Engage {
        /// Element that stays unprocessed.
        element: SourceId,
        /// Engine rejection.
        #[source]
        source: EngineError,
    },

    /// No attachment exists for the element
    #[error("no attachment for media element {0}")]
    UnknownSource(SourceId),
}

impl SessionError {
    /// Create an engage error.
    pub fn engage(element: SourceId, source: EngineError) -> Self {
        SessionError::Engage { element, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn engage_error_chains_the_engine_error() {
        let err = SessionError::engage(SourceId::new(3), EngineError::SourceAlreadyCaptured(SourceId::new(3)));
        assert_eq!(err.to_string(), "failed to attach media element 3");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("media element 3 is already captured by a source node"));
    }

    #[test]
    fn read_file_error_names_the_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::read_file("/etc/patchrome.toml", io);
        assert!(err.to_string().contains("/etc/patchrome.toml"));
    }
}
