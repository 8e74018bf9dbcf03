//! Snapshot persistence: atomic JSON save/restore of all entity state.
//!
//! A snapshot is a single self-describing, versioned JSON document
//! (`snapshot.json`) containing the full contents of the three entity
//! tables. Index internals are **not** persisted — each library carries
//! its index kind and config, and indexes are rebuilt lazily after a
//! restore.
//!
//! # Atomicity
//!
//! Saves serialize to `snapshot.json.tmp` in the target directory, fsync,
//! then rename onto the final path. A reader never observes a partial
//! file; the temp file lives in the same directory so the rename cannot
//! cross a filesystem boundary.
//!
//! The whole layer is optional: with persistence disabled every
//! save/restore operation reports
//! [`Unavailable`](crate::StrataError::Unavailable).

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::chunk::Chunk;
use crate::db::{StoreInner, StrataDB};
use crate::document::Document;
use crate::error::{NotFoundError, Result, StrataError};
use crate::library::Library;
use crate::types::Timestamp;
use crate::vector::create_index;

/// File name of the snapshot within the snapshot directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot document.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SnapshotFile {
    /// Format version; bumped on incompatible layout changes.
    pub version: u32,
    /// When the snapshot was written.
    pub saved_at: Timestamp,
    /// All libraries, including their index kind and config.
    pub libraries: Vec<Library>,
    /// All documents.
    pub documents: Vec<Document>,
    /// All chunks, embeddings included.
    pub chunks: Vec<Chunk>,
}

/// Entity counts of a completed save or restore.
#[derive(Clone, Debug, Serialize)]
pub struct SnapshotStats {
    /// Libraries written or loaded.
    pub libraries: usize,
    /// Documents written or loaded.
    pub documents: usize,
    /// Chunks written or loaded.
    pub chunks: usize,
    /// Path of the snapshot file.
    pub path: PathBuf,
}

impl StrataDB {
    /// Writes a snapshot of all entity state to the snapshot directory.
    ///
    /// Synchronous; returns entity counts on success.
    ///
    /// # Errors
    ///
    /// - [`Unavailable`](StrataError::Unavailable) if persistence is
    ///   disabled
    /// - I/O or serialization failures from the write path
    #[instrument(skip(self))]
    pub fn save_snapshot(&self) -> Result<SnapshotStats> {
        self.require_persistence("save_snapshot")?;

        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let stats = write_snapshot(&self.config.snapshot_dir, &inner)?;
        inner.writes_since_save = 0;
        info!(
            libraries = stats.libraries,
            documents = stats.documents,
            chunks = stats.chunks,
            path = %stats.path.display(),
            "Snapshot saved"
        );
        Ok(stats)
    }

    /// Clears all in-memory state and loads the latest snapshot.
    ///
    /// **Destructive**: any entity not in the snapshot is gone afterwards.
    /// Indexes come back unbuilt; the first query per library triggers a
    /// lazy build.
    ///
    /// # Errors
    ///
    /// - [`Unavailable`](StrataError::Unavailable) if persistence is
    ///   disabled
    /// - [`NotFound`](StrataError::NotFound) if no snapshot file exists
    /// - [`Conflict`](StrataError::Conflict) on duplicate ids inside the
    ///   snapshot file
    #[instrument(skip(self))]
    pub fn restore_snapshot(&self) -> Result<SnapshotStats> {
        self.require_persistence("restore_snapshot")?;

        let file = read_snapshot(&self.config.snapshot_dir)?;

        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let stats = apply_snapshot(&mut inner, file)?;
        inner.writes_since_save = 0;
        info!(
            libraries = stats.libraries,
            documents = stats.documents,
            chunks = stats.chunks,
            "Snapshot restored"
        );
        Ok(stats)
    }

    fn require_persistence(&self, operation: &str) -> Result<()> {
        if !self.config.persistence {
            return Err(StrataError::unavailable(format!(
                "{} requires persistence to be enabled",
                operation
            )));
        }
        Ok(())
    }
}

/// Serializes the store to `<dir>/snapshot.json` via the atomic
/// temp-file-then-rename protocol.
pub(crate) fn write_snapshot(dir: &Path, inner: &StoreInner) -> Result<SnapshotStats> {
    fs::create_dir_all(dir)?;

    let file = SnapshotFile {
        version: SNAPSHOT_VERSION,
        saved_at: Timestamp::now(),
        libraries: sorted_by_id(inner.libraries.values().cloned(), |library| library.id.0),
        documents: sorted_by_id(inner.documents.values().cloned(), |document| document.id.0),
        chunks: sorted_by_id(inner.chunks.values().cloned(), |chunk| chunk.id.0),
    };

    let target = dir.join(SNAPSHOT_FILE);
    let tmp = dir.join(format!("{}.tmp", SNAPSHOT_FILE));

    let bytes = serde_json::to_vec_pretty(&file)?;
    fs::write(&tmp, &bytes)?;
    File::open(&tmp)?.sync_all()?;
    fs::rename(&tmp, &target)?;
    sync_dir(dir)?;

    Ok(SnapshotStats {
        libraries: file.libraries.len(),
        documents: file.documents.len(),
        chunks: file.chunks.len(),
        path: target,
    })
}

/// Reads and parses `<dir>/snapshot.json`.
///
/// # Errors
///
/// - [`NotFound`](StrataError::NotFound) if the file doesn't exist
/// - [`Internal`](StrataError::Internal) on parse failure or an
///   unsupported format version
pub(crate) fn read_snapshot(dir: &Path) -> Result<SnapshotFile> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        return Err(NotFoundError::snapshot(path.display()).into());
    }

    let bytes = fs::read(&path)?;
    let file: SnapshotFile = serde_json::from_slice(&bytes)?;
    if file.version != SNAPSHOT_VERSION {
        return Err(StrataError::internal(format!(
            "unsupported snapshot version {} (expected {})",
            file.version, SNAPSHOT_VERSION
        )));
    }
    Ok(file)
}

/// Replaces the store contents with the snapshot's entities and rebinds
/// the index registry with unbuilt indexes pre-loaded with the chunk
/// vectors (clustering is deferred to the first search).
///
/// Loads into a fresh store and swaps only on success, so a corrupt
/// snapshot leaves the current state untouched.
pub(crate) fn apply_snapshot(inner: &mut StoreInner, file: SnapshotFile) -> Result<SnapshotStats> {
    let mut fresh = StoreInner::new();

    let stats = SnapshotStats {
        libraries: file.libraries.len(),
        documents: file.documents.len(),
        chunks: file.chunks.len(),
        path: PathBuf::from(SNAPSHOT_FILE),
    };

    for library in file.libraries {
        let index = create_index(library.index_kind, &library.index_config)?;
        if fresh.libraries.contains_key(&library.id) {
            return Err(StrataError::conflict("duplicate library id in snapshot"));
        }
        fresh.indexes.insert(library.id, index);
        fresh.libraries.insert(library.id, library);
    }
    for document in file.documents {
        fresh.require_library(document.library_id)?;
        if fresh.documents.insert(document.id, document).is_some() {
            return Err(StrataError::conflict("duplicate document id in snapshot"));
        }
    }
    for chunk in file.chunks {
        let library_id = fresh.library_of_document(chunk.document_id)?;
        if fresh.chunks.contains_key(&chunk.id) {
            return Err(StrataError::conflict("duplicate chunk id in snapshot"));
        }
        fresh
            .index_mut(library_id)?
            .bulk_add(&[(chunk.id, chunk.embedding.clone())])?;
        fresh.chunks.insert(chunk.id, chunk);
    }

    *inner = fresh;
    Ok(stats)
}

/// Deterministic ordering for the on-disk document (maps iterate in
/// arbitrary order).
fn sorted_by_id<T, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(key);
    out
}

/// Flushes directory metadata so the rename itself is durable.
fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}
