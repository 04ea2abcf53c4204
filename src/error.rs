//! Error types for rframe
//!
//! Compilation and backend-resolution errors signal static misconfiguration
//! and are always returned immediately. Selection and write errors are
//! returned per call, except inside `Frame::concat` which records them per
//! record.

use crate::types::IndexKind;
use thiserror::Error;

/// Top-level error type for frame operations
#[derive(Debug, Error)]
pub enum FrameError {
    /// The active interface has no compile case for this descriptor kind.
    #[error("{interface} does not support {kind} indexes")]
    UnsupportedIndexKind {
        interface: &'static str,
        kind: IndexKind,
    },

    /// No interface registered for the connection, or an unrecognized URL.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("selection returned no records")]
    EmptySelection,

    /// An `at` lookup received a non-scalar or under-specified index.
    #[error("ill-defined location: {0}")]
    IllDefinedLocation(String),

    #[error("column '{column}' not found, valid columns are: {columns:?}")]
    ColumnNotFound {
        column: String,
        columns: Vec<String>,
    },

    /// A single write failed, either on validation or in the backend.
    #[error("insertion failed: {0}")]
    Insertion(String),

    #[error("update failed: {0}")]
    Update(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FrameError {
    fn from(err: reqwest::Error) -> Self {
        FrameError::Transport(err.to_string())
    }
}

impl FrameError {
    pub(crate) fn column_not_found(column: &str, columns: &[String]) -> Self {
        FrameError::ColumnNotFound {
            column: column.to_string(),
            columns: columns.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
