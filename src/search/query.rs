//! The query pipeline: index search composed with post-filtering.
//!
//! A query resolves the library, asks its index for candidates, fetches
//! each candidate chunk from the store, applies the filter, and returns
//! up to `k` ranked matches. When a filter is present the pipeline
//! **over-fetches** (3·k candidates) so post-filtering still leaves `k`
//! results in the common case.
//!
//! Candidates are consumed in index order, which is already
//! similarity-descending, so collection stops as soon as `k` matches
//! accumulate. A candidate id whose chunk has been deleted between the
//! index search and the store lookup is skipped silently; the skip is
//! explicit in the code so the tolerance survives any future move to
//! finer-grained locking.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::chunk::Chunk;
use crate::db::StrataDB;
use crate::error::{Result, StrataError};
use crate::search::filter::SearchFilters;
use crate::types::LibraryId;

/// Upper bound on `k` per query.
pub const MAX_K: usize = 1000;

/// Over-fetch multiplier applied per filter kind present.
const OVERFETCH_FACTOR: usize = 3;

/// A single ranked query hit.
#[derive(Clone, Debug, Serialize)]
pub struct QueryMatch {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score under the library's metric (larger = more
    /// similar).
    pub score: f32,
}

/// Ranked results plus query statistics.
#[derive(Clone, Debug, Serialize)]
pub struct QueryResponse {
    /// Matches, score-descending (ties by ascending chunk id).
    pub results: Vec<QueryMatch>,
    /// Number of matches returned.
    pub total: usize,
    /// Wall-clock time spent inside the pipeline.
    pub query_time_ms: f64,
}

/// Candidate count for the index given which filters are present.
///
/// Each filtering stage multiplies the over-fetch factor so a combined
/// declarative + programmatic pass (not currently reachable through the
/// public API, which rejects the combination) would fetch 9·k.
fn fetch_k(k: usize, declarative: bool, programmatic: bool) -> usize {
    let mut fetch = k;
    if declarative {
        fetch *= OVERFETCH_FACTOR;
    }
    if programmatic {
        fetch *= OVERFETCH_FACTOR;
    }
    fetch
}

impl StrataDB {
    /// K-nearest-neighbor search without filters.
    ///
    /// Equivalent to [`query`](Self::query) with no filter and no
    /// predicate.
    pub fn search(&self, library_id: LibraryId, embedding: &[f32], k: usize) -> Result<QueryResponse> {
        self.query(library_id, embedding, k, None, None)
    }

    /// K-nearest-neighbor search with optional declarative filter or
    /// programmatic predicate.
    ///
    /// Supplying **both** a filter and a predicate in the same call is a
    /// usage error. The index builds lazily on the first query after a
    /// restore or a fresh insert burst.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](StrataError::NotFound) for an unknown library
    /// - [`InvalidArgument`](StrataError::InvalidArgument) when `k` is
    ///   outside `1..=1000` or both filter parameters are given
    /// - [`DimensionMismatch`](StrataError::DimensionMismatch) when the
    ///   query length differs from the library's established dimension
    #[instrument(skip(self, embedding, filters, predicate))]
    pub fn query(
        &self,
        library_id: LibraryId,
        embedding: &[f32],
        k: usize,
        filters: Option<&SearchFilters>,
        predicate: Option<&(dyn Fn(&Chunk) -> bool + Send + Sync)>,
    ) -> Result<QueryResponse> {
        if k == 0 || k > MAX_K {
            return Err(StrataError::invalid_argument(format!(
                "k must be between 1 and {}, got {}",
                MAX_K, k
            )));
        }
        if filters.is_some() && predicate.is_some() {
            return Err(StrataError::invalid_argument(
                "declarative filters and a programmatic predicate are mutually exclusive",
            ));
        }

        let start = Instant::now();
        let wanted = fetch_k(k, filters.is_some(), predicate.is_some());

        // Index search and store fetch run under one borrow of the store;
        // the lock itself stays held for the whole operation.
        let guard = self.inner.lock();
        let candidates: Vec<(Chunk, f32)> = {
            let mut inner = guard.borrow_mut();
            inner.require_library(library_id)?;
            let scored = inner.index_mut(library_id)?.search(embedding, wanted)?;

            scored
                .into_iter()
                .filter_map(|(id, score)| {
                    // A chunk can vanish between the index reporting it and
                    // this lookup; tolerate the race by skipping the id.
                    inner.chunks.get(&id).map(|chunk| (chunk.clone(), score))
                })
                .collect()
        };

        // The store borrow is released (the lock is not), so a predicate
        // is free to re-enter the database from this thread.
        let mut results = Vec::with_capacity(k);
        for (chunk, score) in candidates {
            if let Some(filters) = filters {
                if !filters.matches(&chunk) {
                    continue;
                }
            }
            if let Some(predicate) = predicate {
                if !predicate(&chunk) {
                    continue;
                }
            }
            results.push(QueryMatch { chunk, score });
            if results.len() == k {
                break;
            }
        }

        let query_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            total = results.len(),
            query_time_ms, "Query completed"
        );
        Ok(QueryResponse {
            total: results.len(),
            results,
            query_time_ms,
        })
    }
}
