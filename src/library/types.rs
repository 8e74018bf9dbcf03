//! Type definitions for libraries.
//!
//! A **library** is the top-level collection: it owns documents (which own
//! chunks) and a single vector index over every chunk it transitively
//! contains.

use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, LibraryId, Metadata, Timestamp};
use crate::vector::{IndexConfig, IndexKind};

/// A library — the top level of the containment hierarchy.
///
/// # Fields
///
/// - `id` — Unique identifier
/// - `name` — Human-readable name (1–255 characters)
/// - `document_ids` — Owned documents, in insertion order
/// - `index_kind` / `index_config` — The vector index bound to this library
/// - `created_at` / `updated_at` — Lifecycle timestamps
///
/// The embedding dimension is not stored here: it is established by the
/// first chunk inserted into the library and lives on the index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Library {
    /// Unique identifier.
    pub id: LibraryId,

    /// Human-readable name.
    pub name: String,

    /// Owned document ids, in insertion order.
    pub document_ids: Vec<DocumentId>,

    /// Arbitrary metadata.
    pub metadata: Metadata,

    /// Kind of vector index answering queries for this library.
    pub index_kind: IndexKind,

    /// Index configuration (metric, nlist, nprobe).
    pub index_config: IndexConfig,

    /// When this library was created.
    pub created_at: Timestamp,

    /// When this library was last modified.
    pub updated_at: Timestamp,
}

/// Input for [`create_library`](crate::StrataDB::create_library).
#[derive(Clone, Debug, Default)]
pub struct NewLibrary {
    /// Display name (1–255 characters).
    pub name: String,
    /// Arbitrary metadata.
    pub metadata: Metadata,
    /// Index kind; defaults to flat.
    pub index_kind: IndexKind,
    /// Index configuration; defaults to cosine with derived nlist/nprobe.
    pub index_config: IndexConfig,
}

impl NewLibrary {
    /// Creates a request with the given name and defaults otherwise.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update for [`update_library`](crate::StrataDB::update_library).
///
/// Only fields set to `Some(...)` are changed. Any applied update
/// refreshes `updated_at`.
#[derive(Clone, Debug, Default)]
pub struct LibraryUpdate {
    /// New display name.
    pub name: Option<String>,
    /// Replacement metadata map.
    pub metadata: Option<Metadata>,
}

/// Result of an explicit index build, returned by
/// [`build_index`](crate::StrataDB::build_index).
#[derive(Clone, Debug, Serialize)]
pub struct IndexBuildReport {
    /// Library whose index was built.
    pub library_id: LibraryId,
    /// Index kind.
    pub kind: IndexKind,
    /// Embedding dimension, if fixed by at least one insert.
    pub dimension: Option<usize>,
    /// Number of vectors in the index after the build.
    pub total_vectors: usize,
    /// Index configuration in effect.
    pub config: IndexConfig,
}

impl Library {
    /// Creates a new library from a validated request.
    ///
    /// Sets `created_at` and `updated_at` to the current time.
    pub(crate) fn from_new(new: NewLibrary) -> Self {
        let now = Timestamp::now();
        Self {
            id: LibraryId::new(),
            name: new.name,
            document_ids: Vec::new(),
            metadata: new.metadata,
            index_kind: new.index_kind,
            index_config: new.index_config,
            created_at: now,
            updated_at: now,
        }
    }
}
