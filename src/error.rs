//! Error types for the NoobSave engine
//!
//! This module defines every error that can surface from a reconciliation,
//! restoration or settings operation. The taxonomy follows how callers are
//! expected to react:
//!
//! - **Configuration errors** ([`NoobSaveError::InvalidSavePath`],
//!   [`NoobSaveError::InvalidConfiguration`]) abort the mutation with no
//!   partial state change.
//! - **Transient I/O errors** are normally *not* returned at all: a single
//!   unreadable file or unlistable directory is recorded as a
//!   [`PassWarning`](crate::types::PassWarning) and the pass continues.
//! - **Fatal I/O errors** ([`NoobSaveError::SaveRootUnavailable`], or an
//!   [`NoobSaveError::Io`] on the root itself) are surfaced to whoever
//!   triggered the pass.
//! - **Not-found** lookups return `Ok(None)`, never an error.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the NoobSave library
pub type Result<T> = std::result::Result<T, NoobSaveError>;

/// Main error type for all NoobSave operations
#[derive(Debug, Error)]
pub enum NoobSaveError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors raised by the SQLite catalog
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The requested save path cannot be used
    #[error("Invalid save path {path:?}: {reason}")]
    InvalidSavePath {
        /// Path that was rejected
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// The save root does not exist and could not be created
    #[error("Save root {path:?} is unavailable: {source}")]
    SaveRootUnavailable {
        /// Save root that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A catalog entry could not be found where one was required
    #[error("Catalog entry not found: {0}")]
    EntryNotFound(String),

    /// An id prefix matched more than one catalog entry
    #[error("Id prefix '{prefix}' is ambiguous ({matches} entries match)")]
    AmbiguousId {
        /// Prefix as given
        prefix: String,
        /// Number of entries whose id starts with it
        matches: usize,
    },

    /// A stored timestamp could not be parsed back
    #[error("Invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// Raw stored value
        value: String,
        /// Parser message
        reason: String,
    },

    /// Restore operation failed
    #[error("Restore failed: {0}")]
    RestoreFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NoobSaveError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        NoobSaveError::Internal(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        NoobSaveError::InvalidConfiguration(msg.into())
    }

    /// Create a save path validation error
    pub fn invalid_save_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        NoobSaveError::InvalidSavePath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors affect one unit of work (a file, a directory
    /// stream) and a later pass is expected to succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            NoobSaveError::Io(e) => !matches!(e.kind(), std::io::ErrorKind::PermissionDenied),
            NoobSaveError::RestoreFailed(_) => true,
            _ => false,
        }
    }

    /// Check if this error was caused by invalid settings
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NoobSaveError::InvalidSavePath { .. } | NoobSaveError::InvalidConfiguration(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            NoobSaveError::InvalidSavePath { path, reason } => {
                format!(
                    "Cannot use {:?} as the save path ({}). Pick an existing directory.",
                    path, reason
                )
            }
            NoobSaveError::SaveRootUnavailable { path, .. } => {
                format!(
                    "Save root {:?} could not be created. Check that the parent directory is writable.",
                    path
                )
            }
            NoobSaveError::EntryNotFound(id) => {
                format!("No catalog entry '{}'. Use 'noobsave list' to see tracked files.", id)
            }
            NoobSaveError::AmbiguousId { prefix, matches } => {
                format!(
                    "{} entries have ids starting with '{}'. Use a longer prefix or the full id.",
                    matches, prefix
                )
            }
            _ => self.to_string(),
        }
    }
}
