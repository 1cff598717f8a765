//! Error types for patient-tracker.
//!
//! This module defines the error type shared by the store, the repository and
//! configuration loading. Malformed CSV lines are not errors: the codec drops
//! them and reports them as diagnostics instead.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for patient-tracker operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// The durable store exists but could not be read.
    #[error("failed to read record store at {location}: {source}")]
    StorageRead {
        /// Where the store lives (a path or an in-memory label).
        location: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The durable store could not be rewritten.
    #[error("failed to write record store at {location}: {source}")]
    StorageWrite {
        /// Where the store lives (a path or an in-memory label).
        location: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The bootstrap seed file could not be read.
    #[error("failed to read seed data at {path}: {source}")]
    SeedUnavailable {
        /// Path to the seed file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for patient-tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a store read error.
    #[must_use]
    pub fn storage_read(location: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageRead {
            location: location.into(),
            source,
        }
    }

    /// Create a store write error.
    #[must_use]
    pub fn storage_write(location: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            location: location.into(),
            source,
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error means the durable store could not be read or written.
    ///
    /// Callers of `initialize`, `upsert`, `remove` and `restore` use this to
    /// tell storage outages apart from configuration or seed problems.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            Self::StorageRead { .. } | Self::StorageWrite { .. } | Self::DirectoryCreate { .. }
        )
    }
}
