//! Type definitions for chunks.
//!
//! A **chunk** is the searchable unit: a piece of text, its embedding,
//! and metadata the filter DSL evaluates against.

use serde::{Deserialize, Serialize};

use crate::types::{ChunkId, DocumentId, Embedding, Metadata, Timestamp};

/// A chunk — the leaf of the containment hierarchy.
///
/// The store owns the canonical embedding; the library's vector index
/// keeps its own copy keyed by `id`. Updating the embedding invalidates
/// both (modeled as delete + insert at the index level).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier.
    pub id: ChunkId,

    /// Owning document.
    pub document_id: DocumentId,

    /// Text payload.
    pub text: String,

    /// Embedding vector. Length matches the library's established
    /// dimension.
    pub embedding: Embedding,

    /// Arbitrary metadata.
    pub metadata: Metadata,

    /// When this chunk was created.
    pub created_at: Timestamp,

    /// When this chunk was last modified.
    pub updated_at: Timestamp,
}

/// Input for [`create_chunk`](crate::StrataDB::create_chunk) and
/// [`create_chunks_bulk`](crate::StrataDB::create_chunks_bulk).
#[derive(Clone, Debug, Default)]
pub struct NewChunk {
    /// Owning document.
    pub document_id: DocumentId,
    /// Text payload (non-empty).
    pub text: String,
    /// Embedding vector (non-empty; length checked against the library).
    pub embedding: Embedding,
    /// Arbitrary metadata.
    pub metadata: Metadata,
}

impl NewChunk {
    /// Creates a request with the given parent, text, and embedding.
    pub fn new(document_id: DocumentId, text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            document_id,
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }
}

/// Partial update for [`update_chunk`](crate::StrataDB::update_chunk).
///
/// An embedding change is forwarded to the library's index as
/// delete-then-add, possibly moving the chunk between IVF clusters.
#[derive(Clone, Debug, Default)]
pub struct ChunkUpdate {
    /// New text payload (non-empty).
    pub text: Option<String>,
    /// New embedding (length must match the library's dimension).
    pub embedding: Option<Embedding>,
    /// Replacement metadata map.
    pub metadata: Option<Metadata>,
}

impl Chunk {
    /// Creates a new chunk from a validated request.
    pub(crate) fn from_new(new: NewChunk) -> Self {
        let now = Timestamp::now();
        Self {
            id: ChunkId::new(),
            document_id: new.document_id,
            text: new.text,
            embedding: new.embedding,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}
