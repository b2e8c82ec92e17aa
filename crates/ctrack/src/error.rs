//! Error types for ctrack.
//!
//! This module defines all error types used throughout the ctrack crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::editor::ValidationError;

/// The main error type for ctrack operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the backing database.
    #[error("failed to open store at {path}: {source}")]
    StoreOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A store query failed.
    #[error("store query failed: {0}")]
    StoreQuery(#[from] rusqlite::Error),

    /// The store refused the operation.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to migrate a stored document.
    #[error("migration failed: {message}")]
    Migration {
        /// Description of what went wrong.
        message: String,
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

    // === Entry Errors ===
    /// One or more intervals failed validation.
    #[error("{0}")]
    Validation(ValidationError),

    /// Entries cannot be edited for days that haven't happened yet.
    #[error("cannot edit {date}: date is in the future")]
    FutureDate {
        /// The rejected date.
        date: NaiveDate,
    },

    /// A date or month argument could not be parsed.
    #[error("invalid date '{input}': {message}")]
    InvalidDate {
        /// The offending input.
        input: String,
        /// Description of the expected format.
        message: String,
    },

    /// An interval argument could not be parsed.
    #[error("invalid interval '{input}': {message}")]
    InvalidInterval {
        /// The offending input.
        input: String,
        /// Description of the expected format.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for ctrack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl Error {
    /// Create a new store-unavailable error.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a new migration error.
    #[must_use]
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Create an invalid date error.
    #[must_use]
    pub fn invalid_date(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDate {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create an invalid interval error.
    #[must_use]
    pub fn invalid_interval(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInterval {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Check if this error is an interval validation failure.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the storage layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::StoreOpen { .. } | Self::StoreQuery(_) | Self::StoreUnavailable { .. }
        )
    }
}
