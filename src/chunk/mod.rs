//! Chunk management module.
//!
//! A **chunk** is the searchable unit: text, embedding, metadata. Chunk
//! writes are the point where the entity store and the vector index meet:
//! every create/update/delete is forwarded to the owning library's index
//! so that a built index always mirrors the store.
//!
//! # Dimension rule
//!
//! The first chunk inserted into a library fixes the library's embedding
//! dimension. Every later insert or embedding update with a different
//! length fails with [`DimensionMismatch`](crate::StrataError::DimensionMismatch).
//!
//! # Operations
//!
//! All chunk operations are available on [`StrataDB`](crate::StrataDB):
//!
//! - [`create_chunk(new)`](crate::StrataDB::create_chunk)
//! - [`create_chunks_bulk(batch)`](crate::StrataDB::create_chunks_bulk)
//! - [`get_chunk(id)`](crate::StrataDB::get_chunk)
//! - [`list_chunks(document_id)`](crate::StrataDB::list_chunks)
//! - [`update_chunk(id, update)`](crate::StrataDB::update_chunk)
//! - [`delete_chunk(id)`](crate::StrataDB::delete_chunk)

pub mod types;

pub use types::{Chunk, ChunkUpdate, NewChunk};

use std::collections::HashMap;

use tracing::{info, instrument};

use crate::db::StrataDB;
use crate::error::{Result, StrataError};
use crate::types::{ChunkId, DocumentId, LibraryId, Timestamp};

/// Validates the caller-controlled parts of a new chunk.
pub(crate) fn validate_new_chunk(new: &NewChunk) -> Result<()> {
    if new.text.is_empty() {
        return Err(StrataError::invalid_argument("chunk text must not be empty"));
    }
    if new.embedding.is_empty() {
        return Err(StrataError::invalid_argument(
            "chunk embedding must not be empty",
        ));
    }
    Ok(())
}

impl StrataDB {
    /// Creates a new chunk under an existing document and inserts its
    /// embedding into the owning library's index.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::StrataError::NotFound) if the document
    ///   doesn't exist
    /// - [`InvalidArgument`](crate::StrataError::InvalidArgument) for
    ///   empty text or embedding
    /// - [`DimensionMismatch`](crate::StrataError::DimensionMismatch) if
    ///   the embedding length differs from the library's established
    ///   dimension
    #[instrument(skip(self, new), fields(document_id = %new.document_id))]
    pub fn create_chunk(&self, new: NewChunk) -> Result<Chunk> {
        validate_new_chunk(&new)?;

        self.with_store_mut(|inner| {
            let library_id = inner.library_of_document(new.document_id)?;

            // Reject before mutating so the store and index stay in step.
            let established = inner.index_mut(library_id)?.dimension();
            if let Some(expected) = established {
                if expected != new.embedding.len() {
                    return Err(StrataError::dimension_mismatch(expected, new.embedding.len()));
                }
            }

            let chunk = Chunk::from_new(new);
            inner.insert_chunk_record(chunk.clone())?;
            inner.index_mut(library_id)?.add(chunk.id, &chunk.embedding)?;

            info!(id = %chunk.id, "Chunk created");
            Ok(chunk)
        })
    }

    /// Creates a batch of chunks atomically.
    ///
    /// Either every chunk becomes visible or none: on the first failing
    /// element, chunks already inserted by this call are removed again and
    /// the error is returned. The library indexes receive the new vectors
    /// only after all store insertions have succeeded.
    ///
    /// Within one call, the first chunk for a library whose dimension is
    /// not yet fixed establishes it for the rest of the batch.
    ///
    /// # Errors
    ///
    /// As for [`create_chunk`](Self::create_chunk); the store's chunk
    /// count is unchanged on any error.
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub fn create_chunks_bulk(&self, batch: Vec<NewChunk>) -> Result<Vec<Chunk>> {
        self.with_store_mut(|inner| {
            let mut inserted: Vec<ChunkId> = Vec::with_capacity(batch.len());
            let mut per_library: HashMap<LibraryId, Vec<(ChunkId, Vec<f32>)>> = HashMap::new();
            let mut established: HashMap<LibraryId, Option<usize>> = HashMap::new();
            let mut created: Vec<Chunk> = Vec::with_capacity(batch.len());

            let insert_all = || -> Result<()> {
                for new in batch {
                    validate_new_chunk(&new)?;
                    let library_id = inner.library_of_document(new.document_id)?;

                    let slot = match established.get(&library_id) {
                        Some(dim) => *dim,
                        None => {
                            let dim = inner.index_mut(library_id)?.dimension();
                            established.insert(library_id, dim);
                            dim
                        }
                    };
                    match slot {
                        Some(expected) if expected != new.embedding.len() => {
                            return Err(StrataError::dimension_mismatch(
                                expected,
                                new.embedding.len(),
                            ));
                        }
                        None => {
                            established.insert(library_id, Some(new.embedding.len()));
                        }
                        _ => {}
                    }

                    let chunk = Chunk::from_new(new);
                    inner.insert_chunk_record(chunk.clone())?;
                    inserted.push(chunk.id);
                    per_library
                        .entry(library_id)
                        .or_default()
                        .push((chunk.id, chunk.embedding.clone()));
                    created.push(chunk);
                }
                Ok(())
            };

            if let Err(err) = insert_all() {
                // All-or-nothing: undo every insert made by this call.
                for id in inserted {
                    inner.remove_chunk_record(id);
                }
                return Err(err);
            }

            // Store insertions all succeeded; now update the indexes.
            for (library_id, vectors) in per_library {
                inner.index_mut(library_id)?.bulk_add(&vectors)?;
            }

            info!(count = created.len(), "Bulk chunk insert committed");
            Ok(created)
        })
    }

    /// Returns a chunk by ID.
    ///
    /// # Errors
    ///
    /// [`NotFound`](crate::StrataError::NotFound) if the chunk doesn't
    /// exist.
    pub fn get_chunk(&self, id: ChunkId) -> Result<Chunk> {
        self.with_store(|inner| Ok(inner.require_chunk(id)?.clone()))
    }

    /// Lists a document's chunks in insertion order.
    ///
    /// # Errors
    ///
    /// [`NotFound`](crate::StrataError::NotFound) if the document doesn't
    /// exist.
    pub fn list_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>> {
        self.with_store(|inner| {
            let document = inner.require_document(document_id)?;
            document
                .chunk_ids
                .iter()
                .map(|id| Ok(inner.require_chunk(*id)?.clone()))
                .collect()
        })
    }

    /// Updates a chunk's text, embedding, and/or metadata.
    ///
    /// An embedding change is forwarded to the index as delete-then-add
    /// (the chunk may move to a different IVF cluster).
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::StrataError::NotFound) if the chunk doesn't
    ///   exist
    /// - [`InvalidArgument`](crate::StrataError::InvalidArgument) for
    ///   empty text or embedding
    /// - [`DimensionMismatch`](crate::StrataError::DimensionMismatch) if a
    ///   new embedding's length differs from the library's dimension
    #[instrument(skip(self, update))]
    pub fn update_chunk(&self, id: ChunkId, update: ChunkUpdate) -> Result<Chunk> {
        if let Some(ref text) = update.text {
            if text.is_empty() {
                return Err(StrataError::invalid_argument("chunk text must not be empty"));
            }
        }
        if let Some(ref embedding) = update.embedding {
            if embedding.is_empty() {
                return Err(StrataError::invalid_argument(
                    "chunk embedding must not be empty",
                ));
            }
        }

        self.with_store_mut(|inner| {
            let document_id = inner.require_chunk(id)?.document_id;
            let library_id = inner.library_of_document(document_id)?;

            if let Some(ref embedding) = update.embedding {
                let established = inner.index_mut(library_id)?.dimension();
                if let Some(expected) = established {
                    if expected != embedding.len() {
                        return Err(StrataError::dimension_mismatch(expected, embedding.len()));
                    }
                }
                inner.index_mut(library_id)?.update(id, embedding)?;
            }

            let chunk = inner.require_chunk_mut(id)?;
            if let Some(text) = update.text {
                chunk.text = text;
            }
            if let Some(embedding) = update.embedding {
                chunk.embedding = embedding;
            }
            if let Some(metadata) = update.metadata {
                chunk.metadata = metadata;
            }
            chunk.updated_at = Timestamp::now();

            info!(id = %id, "Chunk updated");
            Ok(chunk.clone())
        })
    }

    /// Deletes a chunk, detaching it from its document and removing its
    /// vector from the library's index.
    ///
    /// # Errors
    ///
    /// [`NotFound`](crate::StrataError::NotFound) if the chunk doesn't
    /// exist.
    #[instrument(skip(self))]
    pub fn delete_chunk(&self, id: ChunkId) -> Result<()> {
        self.with_store_mut(|inner| {
            let document_id = inner.require_chunk(id)?.document_id;
            let library_id = inner.library_of_document(document_id)?;

            inner.remove_chunk_record(id);
            inner.index_mut(library_id)?.delete(id)?;

            info!(id = %id, "Chunk deleted");
            Ok(())
        })
    }
}
