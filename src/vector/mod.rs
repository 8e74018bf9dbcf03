//! Vector index family for k-nearest-neighbor search.
//!
//! This module provides a trait-based abstraction over vector indexes with
//! two concrete implementations:
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │        VectorIndex trait         │
//! └──────────┬───────────────────────┘
//!            │
//!    ┌───────┴────────┐
//!    │                │
//! ┌──┴───────┐  ┌─────┴────┐
//! │ FlatIndex│  │ IvfIndex │
//! └──────────┘  └──────────┘
//!   (exact)      (k-means inverted file)
//! ```
//!
//! The entity store is the **source of truth**: indexes hold copies of the
//! chunk embeddings keyed by id, and are rebuilt from store contents after
//! a snapshot restore.
//!
//! Indexes are **not** thread-safe in isolation. All access is serialized
//! by the store lock, so mutating methods take `&mut self`.

mod flat;
mod ivf;
pub mod metric;

pub use flat::FlatIndex;
pub use ivf::IvfIndex;
pub use metric::Metric;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};
use crate::types::ChunkId;

/// Supported vector index kinds.
///
/// Each kind trades accuracy against query cost differently:
/// - `Flat`: exact exhaustive search, O(n·d) per query
/// - `Ivf`: approximate inverted-file search over k-means partitions
/// - `Hnsw`: reserved wire token; not implemented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact exhaustive scan.
    #[default]
    Flat,
    /// Inverted file with k-means clustering (IVFFLAT).
    Ivf,
    /// Reserved for a future graph-based index. Requesting it fails with
    /// [`InvalidArgument`](StrataError::InvalidArgument).
    Hnsw,
}

impl IndexKind {
    /// Returns the wire token for this kind (`flat`, `ivf`, `hnsw`).
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Flat => "flat",
            IndexKind::Ivf => "ivf",
            IndexKind::Hnsw => "hnsw",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-library index configuration.
///
/// Recognized options:
/// - `metric`: scoring function, defaults to cosine (all kinds)
/// - `nlist`: number of IVF clusters; defaults to `floor(sqrt(n))` at
///   build time, clamped to `[1, n]`
/// - `nprobe`: number of IVF clusters probed per query; defaults to 1,
///   effective value is `min(nprobe, nlist)`
///
/// Flat indexes ignore `nlist`/`nprobe`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Scoring function between query and stored vectors.
    #[serde(default)]
    pub metric: Metric,

    /// Number of IVF clusters. `None` means derive from the dataset size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlist: Option<usize>,

    /// Number of IVF clusters probed per query. `None` means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nprobe: Option<usize>,
}

impl IndexConfig {
    /// Creates a config with the given metric and defaults otherwise.
    pub fn with_metric(metric: Metric) -> Self {
        Self {
            metric,
            ..Default::default()
        }
    }

    /// Validates the configuration shape.
    ///
    /// # Errors
    /// Returns [`InvalidArgument`](StrataError::InvalidArgument) if `nlist`
    /// or `nprobe` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.nlist == Some(0) {
            return Err(StrataError::invalid_argument(
                "nlist must be a positive integer",
            ));
        }
        if self.nprobe == Some(0) {
            return Err(StrataError::invalid_argument(
                "nprobe must be a positive integer",
            ));
        }
        Ok(())
    }
}

/// A single ranked search hit: chunk id and similarity score.
pub type ScoredId = (ChunkId, f32);

/// Common contract for all vector index implementations.
///
/// The dimension of an index is fixed by the first successful `add`;
/// every later `add`, `update`, or `search` with a different vector
/// length fails with [`DimensionMismatch`](StrataError::DimensionMismatch).
pub trait VectorIndex: Send {
    /// Inserts a vector under the given id.
    ///
    /// Post-condition: the id is queryable (possibly after a lazy build).
    fn add(&mut self, id: ChunkId, vector: &[f32]) -> Result<()>;

    /// Inserts a batch of vectors.
    ///
    /// Semantically equivalent to repeated [`add`](Self::add), but
    /// implementations may defer clustering work until the next build.
    fn bulk_add(&mut self, items: &[(ChunkId, Vec<f32>)]) -> Result<()> {
        for (id, vector) in items {
            self.add(*id, vector)?;
        }
        Ok(())
    }

    /// Replaces the vector stored under an existing id.
    ///
    /// Semantically delete-then-add; an IVF index may move the id to a
    /// different cluster. Fails with `NotFound` if the id is absent.
    fn update(&mut self, id: ChunkId, vector: &[f32]) -> Result<()>;

    /// Removes the vector stored under the given id.
    ///
    /// Fails with `NotFound` if the id is absent.
    fn delete(&mut self, id: ChunkId) -> Result<()>;

    /// Empties all state and resets the built flag.
    fn clear(&mut self);

    /// Returns up to `k` `(id, score)` pairs, sorted by score descending
    /// with ties broken by ascending id.
    ///
    /// Builds lazily if needed. Returns an empty vec when the index holds
    /// zero vectors (including when the dimension was never fixed).
    fn search(&mut self, query: &[f32], k: usize) -> Result<Vec<ScoredId>>;

    /// Explicitly transitions the index to the built state.
    ///
    /// Calling `build()` on an already-built index re-clusters.
    /// A build over zero vectors is a no-op that still marks the index
    /// built (a degenerate state answering every query with empty).
    fn build(&mut self) -> Result<()>;

    /// Returns the number of stored vectors.
    fn len(&self) -> usize;

    /// Returns true if the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the index has been built.
    fn is_built(&self) -> bool;

    /// Returns the dimension fixed by the first add, if any.
    fn dimension(&self) -> Option<usize>;
}

/// Creates an index instance of the requested kind in the unbuilt state.
///
/// # Errors
/// - [`InvalidArgument`](StrataError::InvalidArgument) for the reserved
///   `hnsw` kind or an invalid config shape.
pub fn create_index(kind: IndexKind, config: &IndexConfig) -> Result<Box<dyn VectorIndex + Send>> {
    config.validate()?;
    match kind {
        IndexKind::Flat => Ok(Box::new(FlatIndex::new(config.clone()))),
        IndexKind::Ivf => Ok(Box::new(IvfIndex::new(config.clone()))),
        IndexKind::Hnsw => Err(StrataError::invalid_argument(
            "index kind 'hnsw' is reserved but not implemented",
        )),
    }
}

/// Sorts scored ids by score descending, breaking ties by ascending id,
/// and truncates to `k`. Shared by both index implementations.
pub(crate) fn rank_top_k(mut scored: Vec<ScoredId>, k: usize) -> Vec<ScoredId> {
    scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}

/// Validates a vector length against an already-fixed dimension.
pub(crate) fn check_dimension(expected: Option<usize>, got: usize) -> Result<()> {
    match expected {
        Some(dim) if dim != got => Err(StrataError::dimension_mismatch(dim, got)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_flat_index() {
        let index = create_index(IndexKind::Flat, &IndexConfig::default()).unwrap();
        assert!(index.is_empty());
        assert!(index.dimension().is_none());
    }

    #[test]
    fn test_create_ivf_index() {
        let config = IndexConfig {
            nlist: Some(4),
            nprobe: Some(2),
            ..Default::default()
        };
        let index = create_index(IndexKind::Ivf, &config).unwrap();
        assert!(!index.is_built());
    }

    #[test]
    fn test_create_hnsw_is_invalid_argument() {
        match create_index(IndexKind::Hnsw, &IndexConfig::default()) {
            Ok(_) => panic!("expected an error"),
            Err(err) => assert!(err.is_invalid_argument()),
        }
    }

    #[test]
    fn test_config_rejects_zero_nlist() {
        let config = IndexConfig {
            nlist: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nlist must be a positive integer"));
    }

    #[test]
    fn test_config_rejects_zero_nprobe() {
        let config = IndexConfig {
            nprobe: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_kind_wire_tokens() {
        assert_eq!(serde_json::to_string(&IndexKind::Flat).unwrap(), "\"flat\"");
        assert_eq!(serde_json::to_string(&IndexKind::Ivf).unwrap(), "\"ivf\"");
        let parsed: IndexKind = serde_json::from_str("\"hnsw\"").unwrap();
        assert_eq!(parsed, IndexKind::Hnsw);
    }

    #[test]
    fn test_rank_top_k_orders_and_truncates() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        let c = ChunkId::new();
        let ranked = rank_top_k(vec![(a, 0.2), (b, 0.9), (c, 0.5)], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], (b, 0.9));
        assert_eq!(ranked[1], (c, 0.5));
    }

    #[test]
    fn test_rank_top_k_ties_break_by_ascending_id() {
        let mut ids = [ChunkId::new(), ChunkId::new()];
        ids.sort();
        let ranked = rank_top_k(vec![(ids[1], 0.5), (ids[0], 0.5)], 2);
        assert_eq!(ranked[0].0, ids[0]);
        assert_eq!(ranked[1].0, ids[1]);
    }

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(None, 3).is_ok());
        assert!(check_dimension(Some(3), 3).is_ok());
        let err = check_dimension(Some(3), 4).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }
}
