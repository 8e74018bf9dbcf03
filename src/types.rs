//! Core type definitions for stratadb identifiers and timestamps.
//!
//! This module defines the fundamental ID types used throughout the crate.
//! All ID types are opaque 128-bit UUIDs, stable across restarts.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Library identifier.
///
/// Libraries are the top level of the containment hierarchy. Each library
/// owns a set of documents and a single vector index.
///
/// # Example
/// ```
/// use stratadb::LibraryId;
///
/// let id = LibraryId::new();
/// println!("Created library: {}", id);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LibraryId(pub Uuid);

impl LibraryId {
    /// Creates a new random LibraryId.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a nil (all zeros) LibraryId.
    /// Useful for testing or sentinel values.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for LibraryId {
    /// Returns a nil (all zeros) LibraryId.
    ///
    /// For a new unique ID, use [`LibraryId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document identifier.
///
/// Documents group chunks within a library. Each document belongs to
/// exactly one library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Creates a new random DocumentId.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a nil (all zeros) DocumentId.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for DocumentId {
    /// Returns a nil (all zeros) DocumentId.
    ///
    /// For a new unique ID, use [`DocumentId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chunk identifier.
///
/// Chunks are the searchable unit: a piece of text plus its embedding.
/// Each chunk belongs to exactly one document.
///
/// `ChunkId` is `Ord` so that ranked search results can break score ties
/// deterministically by ascending identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    /// Creates a new random ChunkId.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a nil (all zeros) ChunkId.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for ChunkId {
    /// Returns a nil (all zeros) ChunkId.
    ///
    /// For a new unique ID, use [`ChunkId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
///
/// Using i64 allows representing dates far into the future and past.
/// Millisecond precision is sufficient for entity lifecycle tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen
    /// in practice), returns a timestamp of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Embedding vector type alias.
///
/// Embeddings are f32 vectors; all chunks within a library share one
/// dimension, fixed by the first chunk inserted into that library.
pub type Embedding = Vec<f32>;

/// Metadata map attached to libraries, documents, and chunks.
///
/// Values are arbitrary JSON, which is what the filter DSL evaluates
/// against (strings, numbers, booleans, arrays).
pub type Metadata = HashMap<String, serde_json::Value>;
