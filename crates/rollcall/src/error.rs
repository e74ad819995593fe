//! Error types for rollcall.
//!
//! This module defines all error types used throughout the rollcall crate.
//! Record and upload errors are meant to be shown to the person at the desk;
//! the rest describe environmental failures.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Record Errors ===
    /// A record with the same name key already exists.
    #[error("an attendee named '{name}' is already registered")]
    DuplicateName {
        /// The name that was rejected.
        name: String,
    },

    /// No record matches the given name.
    #[error("no attendee named '{name}' was found")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The record's payment was already confirmed.
    #[error("payment for '{name}' was already confirmed")]
    AlreadyConfirmed {
        /// The attendee's stored name.
        name: String,
    },

    /// A required field was empty.
    #[error("{field} is required")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },

    // === Table Errors ===
    /// Failed to open or create the attendee table.
    #[error("failed to open attendee table at {path}: {source}")]
    TableOpen {
        /// Path to the table file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A row in the table failed validation.
    #[error("invalid record at line {line}: {message}")]
    InvalidRecord {
        /// One-based line number in the table file.
        line: u64,
        /// Description of the validation failure.
        message: String,
    },

    /// Reading or writing CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // === Upload Errors ===
    /// The uploaded file is not one of the accepted kinds.
    #[error("unsupported file type for '{file_name}'; accepted: {accepted}")]
    UnsupportedType {
        /// The original file name.
        file_name: String,
        /// Comma-separated list of accepted extensions.
        accepted: String,
    },

    /// The uploaded file exceeds the size limit.
    #[error("file is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge {
        /// Size of the rejected file.
        size: u64,
        /// Configured limit.
        limit: u64,
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

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to move a rewritten file into place.
    #[error("failed to replace {path}: {source}")]
    Persist {
        /// Destination path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a duplicate name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an invalid record error.
    #[must_use]
    pub fn invalid_record(line: u64, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error indicates a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a rejected upload.
    #[must_use]
    pub fn is_upload_rejection(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. } | Self::TooLarge { .. })
    }

    /// Check if this error should be reported back to the user as-is.
    ///
    /// These are the outcomes of a normal interaction: nothing was written and
    /// the process can carry on.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName { .. }
                | Self::NotFound { .. }
                | Self::AlreadyConfirmed { .. }
                | Self::MissingField { .. }
                | Self::UnsupportedType { .. }
                | Self::TooLarge { .. }
        )
    }
}
