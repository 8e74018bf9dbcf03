//! Type definitions for documents.
//!
//! A **document** groups chunks within a library. It carries no vector
//! data of its own; its chunk list drives cascade deletion and the
//! `document_ids` query constraint.

use serde::{Deserialize, Serialize};

use crate::types::{ChunkId, DocumentId, LibraryId, Metadata, Timestamp};

/// A document — the middle level of the containment hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: DocumentId,

    /// Owning library.
    pub library_id: LibraryId,

    /// Human-readable name.
    pub name: String,

    /// Owned chunk ids, in insertion order.
    pub chunk_ids: Vec<ChunkId>,

    /// Arbitrary metadata.
    pub metadata: Metadata,

    /// When this document was created.
    pub created_at: Timestamp,

    /// When this document was last modified.
    pub updated_at: Timestamp,
}

/// Input for [`create_document`](crate::StrataDB::create_document).
#[derive(Clone, Debug, Default)]
pub struct NewDocument {
    /// Owning library.
    pub library_id: LibraryId,
    /// Display name (1–255 characters).
    pub name: String,
    /// Arbitrary metadata.
    pub metadata: Metadata,
}

impl NewDocument {
    /// Creates a request with the given parent and name.
    pub fn new(library_id: LibraryId, name: impl Into<String>) -> Self {
        Self {
            library_id,
            name: name.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Partial update for [`update_document`](crate::StrataDB::update_document).
#[derive(Clone, Debug, Default)]
pub struct DocumentUpdate {
    /// New display name.
    pub name: Option<String>,
    /// Replacement metadata map.
    pub metadata: Option<Metadata>,
}

impl Document {
    /// Creates a new document from a validated request.
    pub(crate) fn from_new(new: NewDocument) -> Self {
        let now = Timestamp::now();
        Self {
            id: DocumentId::new(),
            library_id: new.library_id,
            name: new.name,
            chunk_ids: Vec::new(),
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}
