//! Library management module.
//!
//! A **library** is a logical collection of documents with one vector
//! index over all chunks it transitively owns. The index is created in
//! the unbuilt state alongside the library and bound to it in the
//! registry for the library's whole lifetime.
//!
//! # Operations
//!
//! All library operations are available on [`StrataDB`](crate::StrataDB):
//!
//! - [`create_library(new)`](crate::StrataDB::create_library)
//! - [`get_library(id)`](crate::StrataDB::get_library)
//! - [`list_libraries()`](crate::StrataDB::list_libraries)
//! - [`update_library(id, update)`](crate::StrataDB::update_library)
//! - [`delete_library(id)`](crate::StrataDB::delete_library)
//! - [`build_index(id)`](crate::StrataDB::build_index)

pub mod types;

pub use types::{IndexBuildReport, Library, LibraryUpdate, NewLibrary};

use tracing::{info, instrument};

use crate::db::StrataDB;
use crate::error::{Result, StrataError};
use crate::types::{LibraryId, Timestamp};
use crate::vector::create_index;

/// Maximum display-name length for libraries and documents.
pub(crate) const MAX_NAME_LENGTH: usize = 255;

/// Validates a library display name: 1–255 characters, not
/// whitespace-only.
pub(crate) fn validate_library_name(name: &str) -> Result<()> {
    validate_display_name("library name", name)
}

/// Shared name rule for libraries and documents.
pub(crate) fn validate_display_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StrataError::invalid_argument(format!(
            "{} must not be empty or whitespace-only",
            field
        )));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(StrataError::invalid_argument(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

impl StrataDB {
    /// Creates a new library together with its (unbuilt) vector index.
    ///
    /// # Errors
    ///
    /// [`InvalidArgument`](StrataError::InvalidArgument) if the name is
    /// empty/too long, the index kind is unsupported, or the index config
    /// is invalid (e.g., non-positive `nlist`).
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create_library(&self, new: NewLibrary) -> Result<Library> {
        validate_library_name(&new.name)?;
        // Fails before any state changes if the kind/config is unusable.
        let index = create_index(new.index_kind, &new.index_config)?;

        self.with_store_mut(|inner| {
            let library = Library::from_new(new);
            let id = library.id;
            inner.indexes.insert(id, index);
            inner.libraries.insert(id, library.clone());
            info!(id = %id, kind = %library.index_kind, "Library created");
            Ok(library)
        })
    }

    /// Returns a library by ID.
    ///
    /// # Errors
    ///
    /// [`NotFound`](StrataError::NotFound) if the library doesn't exist.
    pub fn get_library(&self, id: LibraryId) -> Result<Library> {
        self.with_store(|inner| Ok(inner.require_library(id)?.clone()))
    }

    /// Lists all libraries, ordered by creation time (then id, for
    /// libraries created in the same millisecond).
    pub fn list_libraries(&self) -> Vec<Library> {
        self.with_store(|inner| {
            let mut libraries: Vec<Library> = inner.libraries.values().cloned().collect();
            libraries.sort_by_key(|library| (library.created_at, library.id));
            Ok(libraries)
        })
        .unwrap_or_default()
    }

    /// Updates a library's name and/or metadata.
    ///
    /// Only fields set to `Some(...)` change; any applied update refreshes
    /// `updated_at`. The index kind and configuration are fixed at
    /// creation.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](StrataError::NotFound) if the library doesn't exist
    /// - [`InvalidArgument`](StrataError::InvalidArgument) for an invalid
    ///   name
    #[instrument(skip(self, update))]
    pub fn update_library(&self, id: LibraryId, update: LibraryUpdate) -> Result<Library> {
        if let Some(ref name) = update.name {
            validate_library_name(name)?;
        }

        self.with_store_mut(|inner| {
            let library = inner.require_library_mut(id)?;
            if let Some(name) = update.name {
                library.name = name;
            }
            if let Some(metadata) = update.metadata {
                library.metadata = metadata;
            }
            library.updated_at = Timestamp::now();
            Ok(library.clone())
        })
    }

    /// Deletes a library with all its documents and chunks, and drops its
    /// index from the registry.
    ///
    /// # Errors
    ///
    /// [`NotFound`](StrataError::NotFound) if the library doesn't exist.
    #[instrument(skip(self))]
    pub fn delete_library(&self, id: LibraryId) -> Result<()> {
        self.with_store_mut(|inner| {
            let document_ids = inner.require_library(id)?.document_ids.clone();

            let mut deleted_chunks = 0;
            for document_id in document_ids {
                deleted_chunks += inner.delete_document_cascade(document_id)?;
            }

            inner.libraries.remove(&id);
            inner.indexes.remove(&id);
            info!(id = %id, chunks = deleted_chunks, "Library deleted");
            Ok(())
        })
    }

    /// Explicitly (re)builds the library's index.
    ///
    /// Building an already-built IVF index re-clusters from scratch.
    /// Building over zero vectors is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// [`NotFound`](StrataError::NotFound) if the library doesn't exist.
    #[instrument(skip(self))]
    pub fn build_index(&self, id: LibraryId) -> Result<IndexBuildReport> {
        self.with_store_mut(|inner| {
            let library = inner.require_library(id)?;
            let kind = library.index_kind;
            let config = library.index_config.clone();

            let index = inner.index_mut(id)?;
            let start = std::time::Instant::now();
            index.build()?;
            info!(
                id = %id,
                vectors = index.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Index built"
            );

            Ok(IndexBuildReport {
                library_id: id,
                kind,
                dimension: index.dimension(),
                total_vectors: index.len(),
                config,
            })
        })
    }
}
