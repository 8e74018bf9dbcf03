//! Document management module.
//!
//! A **document** groups chunks under a library. Deleting a document
//! cascades to its chunks and removes their vectors from the library's
//! index.
//!
//! # Operations
//!
//! All document operations are available on [`StrataDB`](crate::StrataDB):
//!
//! - [`create_document(new)`](crate::StrataDB::create_document)
//! - [`get_document(id)`](crate::StrataDB::get_document)
//! - [`list_documents(library_id)`](crate::StrataDB::list_documents)
//! - [`update_document(id, update)`](crate::StrataDB::update_document)
//! - [`delete_document(id)`](crate::StrataDB::delete_document)

pub mod types;

pub use types::{Document, DocumentUpdate, NewDocument};

use tracing::{info, instrument};

use crate::db::StrataDB;
use crate::error::Result;
use crate::library::validate_display_name;
use crate::types::{DocumentId, LibraryId, Timestamp};

impl StrataDB {
    /// Creates a new document under an existing library.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::StrataError::NotFound) if the library doesn't
    ///   exist
    /// - [`InvalidArgument`](crate::StrataError::InvalidArgument) for an
    ///   invalid name
    #[instrument(skip(self, new), fields(library_id = %new.library_id, name = %new.name))]
    pub fn create_document(&self, new: NewDocument) -> Result<Document> {
        validate_display_name("document name", &new.name)?;

        self.with_store_mut(|inner| {
            inner.require_library(new.library_id)?;
            let document = Document::from_new(new);

            let library = inner.require_library_mut(document.library_id)?;
            library.document_ids.push(document.id);
            inner.documents.insert(document.id, document.clone());

            info!(id = %document.id, "Document created");
            Ok(document)
        })
    }

    /// Returns a document by ID.
    ///
    /// # Errors
    ///
    /// [`NotFound`](crate::StrataError::NotFound) if the document doesn't
    /// exist.
    pub fn get_document(&self, id: DocumentId) -> Result<Document> {
        self.with_store(|inner| Ok(inner.require_document(id)?.clone()))
    }

    /// Lists a library's documents in insertion order.
    ///
    /// # Errors
    ///
    /// [`NotFound`](crate::StrataError::NotFound) if the library doesn't
    /// exist.
    pub fn list_documents(&self, library_id: LibraryId) -> Result<Vec<Document>> {
        self.with_store(|inner| {
            let library = inner.require_library(library_id)?;
            library
                .document_ids
                .iter()
                .map(|id| Ok(inner.require_document(*id)?.clone()))
                .collect()
        })
    }

    /// Updates a document's name and/or metadata.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::StrataError::NotFound) if the document
    ///   doesn't exist
    /// - [`InvalidArgument`](crate::StrataError::InvalidArgument) for an
    ///   invalid name
    #[instrument(skip(self, update))]
    pub fn update_document(&self, id: DocumentId, update: DocumentUpdate) -> Result<Document> {
        if let Some(ref name) = update.name {
            validate_display_name("document name", name)?;
        }

        self.with_store_mut(|inner| {
            let document = inner.require_document_mut(id)?;
            if let Some(name) = update.name {
                document.name = name;
            }
            if let Some(metadata) = update.metadata {
                document.metadata = metadata;
            }
            document.updated_at = Timestamp::now();
            Ok(document.clone())
        })
    }

    /// Deletes a document and all its chunks.
    ///
    /// Chunk vectors are removed from the library's index; the document is
    /// detached from its parent library.
    ///
    /// # Errors
    ///
    /// [`NotFound`](crate::StrataError::NotFound) if the document doesn't
    /// exist.
    #[instrument(skip(self))]
    pub fn delete_document(&self, id: DocumentId) -> Result<()> {
        self.with_store_mut(|inner| {
            let deleted_chunks = inner.delete_document_cascade(id)?;
            info!(id = %id, chunks = deleted_chunks, "Document deleted");
            Ok(())
        })
    }
}
