//! # stratadb
//!
//! Embedded vector database with a three-level collection hierarchy,
//! pluggable indexes, declarative metadata filtering, and optional JSON
//! snapshot persistence.
//!
//! ## Quick Start
//!
//! ```rust
//! use stratadb::{Config, NewChunk, NewDocument, NewLibrary, StrataDB};
//!
//! # fn main() -> stratadb::Result<()> {
//! let db = StrataDB::open(Config::default())?;
//!
//! // Create a library (owns a vector index) and a document
//! let library = db.create_library(NewLibrary::new("knowledge-base"))?;
//! let document = db.create_document(NewDocument::new(library.id, "intro"))?;
//!
//! // Insert a chunk; the first embedding fixes the library's dimension
//! db.create_chunk(NewChunk::new(document.id, "hello vectors", vec![1.0, 0.0, 0.0]))?;
//!
//! // k-nearest-neighbor search (builds the index lazily)
//! let response = db.search(library.id, &[1.0, 0.0, 0.0], 5)?;
//! assert_eq!(response.total, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Hierarchy
//!
//! A **library** owns **documents**, which own **chunks** — the
//! searchable unit of text + embedding + metadata. Deleting a parent
//! cascades to everything it contains.
//!
//! ### Indexes
//!
//! Each library binds one vector index: `flat` (exact exhaustive scan) or
//! `ivf` (approximate inverted-file search over k-means partitions).
//! Indexes build lazily on first search and are maintained incrementally
//! by chunk writes.
//!
//! ### Filtering
//!
//! Queries accept a declarative filter tree (`and`/`or` groups over
//! metadata comparisons, plus temporal and document-id constraints) or a
//! programmatic predicate, with server-side over-fetch so post-filtering
//! still returns `k` results.
//!
//! ### Snapshots
//!
//! With persistence enabled, the full entity state serializes to a single
//! versioned JSON file via an atomic temp-file-then-rename write. Index
//! internals are never persisted; they rebuild on demand after restore.
//!
//! ## Thread Safety
//!
//! [`StrataDB`] is `Send + Sync`; share it across threads with `Arc`. A
//! single reentrant mutex serializes all operations over the store and
//! its indexes.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod types;

// Domain modules
mod chunk;
mod document;
mod library;

/// Search: declarative filtering and the query pipeline.
pub mod search;

/// Snapshot persistence layer.
pub mod snapshot;

/// Vector index family (flat and IVF) and similarity metrics.
pub mod vector;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main database interface
pub use db::{StatusReport, StrataDB};

// Configuration
pub use config::{Config, AUTOSAVE_DISABLED};

// Error handling
pub use error::{NotFoundError, Result, StrataError};

// Core types
pub use types::{ChunkId, DocumentId, Embedding, LibraryId, Metadata, Timestamp};

// Domain types
pub use chunk::{Chunk, ChunkUpdate, NewChunk};
pub use document::{Document, DocumentUpdate, NewDocument};
pub use library::{IndexBuildReport, Library, LibraryUpdate, NewLibrary};

// Search
pub use search::{
    FilterGroup, FilterNode, FilterOperator, LogicalOperator, MetadataFilter, QueryMatch,
    QueryResponse, SearchFilters, MAX_K,
};

// Snapshots
pub use snapshot::SnapshotStats;

// Index configuration
pub use vector::{IndexConfig, IndexKind, Metric};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common stratadb usage.
///
/// ```rust
/// use stratadb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::chunk::{Chunk, NewChunk};
    pub use crate::config::Config;
    pub use crate::db::StrataDB;
    pub use crate::document::{Document, NewDocument};
    pub use crate::error::{Result, StrataError};
    pub use crate::library::{Library, NewLibrary};
    pub use crate::search::SearchFilters;
    pub use crate::types::{ChunkId, DocumentId, LibraryId, Timestamp};
    pub use crate::vector::{IndexConfig, IndexKind, Metric};
}
