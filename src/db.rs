//! StrataDB main struct and lifecycle operations.
//!
//! [`StrataDB`] is the primary interface for interacting with the engine.
//! It owns the three entity tables, the per-library index registry, and
//! the snapshot write counter. Entity CRUD lives in the feature modules
//! (`library`, `document`, `chunk`), search in `search::query`, and
//! persistence in `snapshot`; all of them extend `impl StrataDB` here.
//!
//! # Concurrency
//!
//! A single **reentrant** mutex guards the entity store together with its
//! index registry. Every public operation (queries included) acquires it
//! for its full duration, which is sufficient because the indexes are not
//! thread-safe in isolation. Reentrancy lets a service-level operation
//! call a lower-level one under the same logical transaction. Mutable
//! access under the shared guard goes through a `RefCell`, the standard
//! companion to a reentrant lock; each public operation takes exactly one
//! borrow, so borrows never overlap.
//!
//! Queries and writes serialize, which is an accepted limitation at the
//! target scale (tens to hundreds of thousands of vectors per library).
//!
//! # Thread Safety
//!
//! `StrataDB` is `Send + Sync` and can be shared across threads using `Arc`.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratadb::{Config, StrataDB};
//!
//! let db = Arc::new(StrataDB::open(Config::default())?);
//! let db_clone = Arc::clone(&db);
//! std::thread::spawn(move || {
//!     // Safe to use db_clone here
//! });
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use parking_lot::ReentrantMutex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::chunk::Chunk;
use crate::config::Config;
use crate::document::Document;
use crate::error::{NotFoundError, Result, StrataError};
use crate::library::Library;
use crate::snapshot;
use crate::types::{ChunkId, DocumentId, LibraryId};
use crate::vector::VectorIndex;

/// The main database handle.
///
/// Create an instance with [`StrataDB::open()`]. All state lives in
/// memory; when persistence is enabled the engine restores the latest
/// snapshot on open and can save explicitly or via autosave.
pub struct StrataDB {
    /// Entity tables + index registry behind the single reentrant lock.
    pub(crate) inner: ReentrantMutex<RefCell<StoreInner>>,

    /// Process-level configuration (persistence, autosave).
    pub(crate) config: Config,
}

/// Entity tables and the index registry.
///
/// Parent→child relationships are broken into id lists on the parent and
/// a parent id on the child; the maps are the arena, resolution is by
/// lookup. The registry binds exactly one index instance per library.
pub(crate) struct StoreInner {
    pub(crate) libraries: HashMap<LibraryId, Library>,
    pub(crate) documents: HashMap<DocumentId, Document>,
    pub(crate) chunks: HashMap<ChunkId, Chunk>,
    pub(crate) indexes: HashMap<LibraryId, Box<dyn VectorIndex + Send>>,

    /// Mutating operations since the last successful snapshot.
    pub(crate) writes_since_save: u64,
}

/// Entity counts and persistence state, returned by
/// [`status`](StrataDB::status).
#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    /// Number of libraries.
    pub libraries: usize,
    /// Number of documents.
    pub documents: usize,
    /// Number of chunks.
    pub chunks: usize,
    /// Whether the snapshot layer is enabled.
    pub persistence_enabled: bool,
    /// Writes between autosaves; `-1` when disabled.
    pub autosave_threshold: i64,
    /// Mutations since the last successful snapshot.
    pub writes_since_save: u64,
}

impl std::fmt::Debug for StrataDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        f.debug_struct("StrataDB")
            .field("libraries", &inner.libraries.len())
            .field("documents", &inner.documents.len())
            .field("chunks", &inner.chunks.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StrataDB {
    /// Opens a database with the given configuration.
    ///
    /// When persistence is enabled and a snapshot file exists in the
    /// snapshot directory, the entity tables are restored from it and the
    /// index registry is instantiated with unbuilt indexes; the first
    /// search per library triggers a lazy build.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument`](StrataError::InvalidArgument) if the
    ///   configuration is invalid (see [`Config::validate`])
    /// - Snapshot read/parse errors when restoring on start
    #[instrument(skip(config))]
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Self {
            inner: ReentrantMutex::new(RefCell::new(StoreInner::new())),
            config,
        };

        if db.config.persistence {
            match snapshot::read_snapshot(&db.config.snapshot_dir) {
                Ok(file) => {
                    let guard = db.inner.lock();
                    let mut inner = guard.borrow_mut();
                    let stats = snapshot::apply_snapshot(&mut inner, file)?;
                    info!(
                        libraries = stats.libraries,
                        documents = stats.documents,
                        chunks = stats.chunks,
                        "Restored snapshot on open"
                    );
                }
                Err(StrataError::NotFound(_)) => {
                    info!("No snapshot found; starting empty");
                }
                Err(err) => return Err(err),
            }
        }

        info!(persistence = db.config.persistence, "StrataDB opened");
        Ok(db)
    }

    /// Returns a reference to the configuration this handle was opened with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns entity counts and autosave state.
    pub fn status(&self) -> StatusReport {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        StatusReport {
            libraries: inner.libraries.len(),
            documents: inner.documents.len(),
            chunks: inner.chunks.len(),
            persistence_enabled: self.config.persistence,
            autosave_threshold: self.config.autosave_threshold,
            writes_since_save: inner.writes_since_save,
        }
    }

    // =========================================================================
    // Internal lock plumbing (used by the feature modules)
    // =========================================================================

    /// Runs a read-oriented closure under the store lock.
    ///
    /// The closure still receives `&mut StoreInner` because searches
    /// mutate index state (lazy builds).
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut StoreInner) -> Result<R>) -> Result<R> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        f(&mut inner)
    }

    /// Runs a mutating closure under the store lock, then bumps the write
    /// counter and fires autosave at the configured threshold.
    pub(crate) fn with_store_mut<R>(
        &self,
        f: impl FnOnce(&mut StoreInner) -> Result<R>,
    ) -> Result<R> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let out = f(&mut inner)?;
        self.note_write(&mut inner);
        Ok(out)
    }

    /// Counts a completed mutation and autosaves at the threshold.
    ///
    /// Runs while the store lock is held so the snapshot observes a
    /// consistent state. An autosave failure is logged and the counter is
    /// left as-is, so the next write retries.
    pub(crate) fn note_write(&self, inner: &mut StoreInner) {
        inner.writes_since_save += 1;
        if !self.config.autosave_enabled() {
            return;
        }
        if inner.writes_since_save >= self.config.autosave_threshold as u64 {
            match snapshot::write_snapshot(&self.config.snapshot_dir, inner) {
                Ok(stats) => {
                    inner.writes_since_save = 0;
                    info!(
                        chunks = stats.chunks,
                        path = %stats.path.display(),
                        "Autosave snapshot written"
                    );
                }
                Err(err) => {
                    warn!(error = %err, "Autosave failed; will retry on next write");
                }
            }
        }
    }
}

impl StoreInner {
    pub(crate) fn new() -> Self {
        Self {
            libraries: HashMap::new(),
            documents: HashMap::new(),
            chunks: HashMap::new(),
            indexes: HashMap::new(),
            writes_since_save: 0,
        }
    }

    // ------------------------------------------------------------------
    // Lookup helpers
    // ------------------------------------------------------------------

    pub(crate) fn require_library(&self, id: LibraryId) -> Result<&Library> {
        self.libraries
            .get(&id)
            .ok_or_else(|| NotFoundError::library(id).into())
    }

    pub(crate) fn require_library_mut(&mut self, id: LibraryId) -> Result<&mut Library> {
        self.libraries
            .get_mut(&id)
            .ok_or_else(|| NotFoundError::library(id).into())
    }

    pub(crate) fn require_document(&self, id: DocumentId) -> Result<&Document> {
        self.documents
            .get(&id)
            .ok_or_else(|| NotFoundError::document(id).into())
    }

    pub(crate) fn require_document_mut(&mut self, id: DocumentId) -> Result<&mut Document> {
        self.documents
            .get_mut(&id)
            .ok_or_else(|| NotFoundError::document(id).into())
    }

    pub(crate) fn require_chunk(&self, id: ChunkId) -> Result<&Chunk> {
        self.chunks
            .get(&id)
            .ok_or_else(|| NotFoundError::chunk(id).into())
    }

    pub(crate) fn require_chunk_mut(&mut self, id: ChunkId) -> Result<&mut Chunk> {
        self.chunks
            .get_mut(&id)
            .ok_or_else(|| NotFoundError::chunk(id).into())
    }

    /// Resolves the library that owns the given document.
    pub(crate) fn library_of_document(&self, document_id: DocumentId) -> Result<LibraryId> {
        Ok(self.require_document(document_id)?.library_id)
    }

    /// Returns the index bound to a library. A missing registry entry for
    /// an extant library is an invariant violation.
    pub(crate) fn index_mut(
        &mut self,
        library_id: LibraryId,
    ) -> Result<&mut Box<dyn VectorIndex + Send>> {
        self.indexes.get_mut(&library_id).ok_or_else(|| {
            StrataError::internal(format!("no index registered for library {}", library_id))
        })
    }

    // ------------------------------------------------------------------
    // Record-level mutations shared by CRUD and cascade paths
    // ------------------------------------------------------------------

    /// Inserts a chunk record and attaches it to its parent document.
    /// Does not touch the index; callers forward separately so that bulk
    /// insertion can delay index updates until the whole batch succeeded.
    pub(crate) fn insert_chunk_record(&mut self, chunk: Chunk) -> Result<()> {
        if self.chunks.contains_key(&chunk.id) {
            return Err(StrataError::conflict(format!(
                "chunk {} already exists",
                chunk.id
            )));
        }
        let document = self.require_document_mut(chunk.document_id)?;
        document.chunk_ids.push(chunk.id);
        self.chunks.insert(chunk.id, chunk);
        Ok(())
    }

    /// Removes a chunk record and detaches it from its parent document.
    /// Returns the removed chunk. Does not touch the index.
    pub(crate) fn remove_chunk_record(&mut self, id: ChunkId) -> Option<Chunk> {
        let chunk = self.chunks.remove(&id)?;
        if let Some(document) = self.documents.get_mut(&chunk.document_id) {
            document.chunk_ids.retain(|cid| *cid != id);
        }
        Some(chunk)
    }

    /// Deletes a document with all its chunks, forwarding each chunk
    /// removal to the library's index. Detaches the document from its
    /// parent library. Returns the number of chunks removed.
    pub(crate) fn delete_document_cascade(&mut self, document_id: DocumentId) -> Result<usize> {
        let document = self.require_document(document_id)?;
        let library_id = document.library_id;
        let chunk_ids = document.chunk_ids.clone();

        for chunk_id in &chunk_ids {
            self.chunks.remove(chunk_id);
            if let Some(index) = self.indexes.get_mut(&library_id) {
                index.delete(*chunk_id)?;
            }
        }

        self.documents.remove(&document_id);
        if let Some(library) = self.libraries.get_mut(&library_id) {
            library.document_ids.retain(|did| *did != document_id);
        }
        Ok(chunk_ids.len())
    }
}
