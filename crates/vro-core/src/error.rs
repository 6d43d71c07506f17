//! Error types for the vro core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by source tree backends.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path escapes the tree or is otherwise malformed.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// Underlying storage failure.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Wrap an I/O error, folding `NotFound` into [`SourceError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path.to_string_lossy().into_owned());
        }
        Self::Io { path, source }
    }

    /// Whether this error means the entry is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment could not be read or deserialized.
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),

    /// A value was read but is out of range.
    #[error("invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
