//! Error types for stratadb.
//!
//! The crate uses a flat, kind-oriented error taxonomy:
//! - `StrataError` is the top-level error returned by all public APIs
//! - `NotFoundError` identifies which entity kind was missing
//!
//! The core returns rich error values and never converts them to
//! transport-level codes; an HTTP adapter is expected to map them
//! (`NotFound` → 404, `InvalidArgument`/`DimensionMismatch` → 400,
//! `Unavailable` → 503, `Conflict` → 409).
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use stratadb::{Config, Result, StrataDB};
//!
//! fn example() -> Result<()> {
//!     let db = StrataDB::open(Config::default())?;
//!     // ... operations that may fail ...
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias for stratadb operations.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Top-level error enum for all stratadb operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// Schema violation, unknown enum value, mutually exclusive options,
    /// k out of range, or invalid index configuration.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of what is wrong with the argument.
        reason: String,
    },

    /// Embedding length does not match the library's established dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension, fixed by the first chunk in the library.
        expected: usize,
        /// Actual dimension provided.
        got: usize,
    },

    /// Snapshot operation requested while persistence is disabled.
    #[error("Unavailable: {reason}")]
    Unavailable {
        /// Why the operation cannot be served.
        reason: String,
    },

    /// Name or identifier collision (e.g., duplicate UUID on restore).
    #[error("Conflict: {reason}")]
    Conflict {
        /// Description of the colliding state.
        reason: String,
    },

    /// Unexpected invariant violation. Logged and propagated.
    #[error("Internal error: {reason}")]
    Internal {
        /// Description of the violated invariant.
        reason: String,
    },

    /// I/O error from the snapshot layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrataError {
    /// Creates an invalid argument error with the given reason.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    /// Creates an unavailable error with the given reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a conflict error with the given reason.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Creates an internal error with the given reason.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is an invalid argument error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Returns true if this is a dimension mismatch error.
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }

    /// Returns true if this is an unavailable error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns true if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

// Snapshot deserialization failures indicate a corrupt or foreign file,
// which the caller cannot repair through the API.
impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        StrataError::Internal {
            reason: format!("snapshot serialization failed: {}", err),
        }
    }
}

/// Not found errors for specific entity kinds.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Library with given ID not found.
    #[error("Library not found: {0}")]
    Library(String),

    /// Document with given ID not found.
    #[error("Document not found: {0}")]
    Document(String),

    /// Chunk with given ID not found.
    #[error("Chunk not found: {0}")]
    Chunk(String),

    /// No snapshot file present in the snapshot directory.
    #[error("Snapshot not found: {0}")]
    Snapshot(String),
}

impl NotFoundError {
    /// Creates a library not found error.
    pub fn library(id: impl ToString) -> Self {
        Self::Library(id.to_string())
    }

    /// Creates a document not found error.
    pub fn document(id: impl ToString) -> Self {
        Self::Document(id.to_string())
    }

    /// Creates a chunk not found error.
    pub fn chunk(id: impl ToString) -> Self {
        Self::Chunk(id.to_string())
    }

    /// Creates a snapshot not found error.
    pub fn snapshot(path: impl ToString) -> Self {
        Self::Snapshot(path.to_string())
    }
}
