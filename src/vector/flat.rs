//! Exact exhaustive-scan index.
//!
//! The flat index stores an ordered `id → vector` mapping and scores the
//! query against every stored vector on search. It has no separate build
//! step: it is always effectively built. Recall is exact, which also makes
//! it the baseline the IVF recall tests compare against.
//!
//! Time: O(n·d + n·log n) per search. Space: O(n·d).

use std::collections::BTreeMap;

use crate::error::{NotFoundError, Result};
use crate::types::ChunkId;

use super::{check_dimension, rank_top_k, IndexConfig, ScoredId, VectorIndex};

/// Exhaustive exact-recall vector index.
#[derive(Debug)]
pub struct FlatIndex {
    config: IndexConfig,
    dimension: Option<usize>,
    vectors: BTreeMap<ChunkId, Vec<f32>>,
}

impl FlatIndex {
    /// Creates an empty flat index. The dimension is fixed by the first add.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            dimension: None,
            vectors: BTreeMap::new(),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, id: ChunkId, vector: &[f32]) -> Result<()> {
        check_dimension(self.dimension, vector.len())?;
        self.dimension.get_or_insert(vector.len());
        self.vectors.insert(id, vector.to_vec());
        Ok(())
    }

    fn update(&mut self, id: ChunkId, vector: &[f32]) -> Result<()> {
        if !self.vectors.contains_key(&id) {
            return Err(NotFoundError::chunk(id).into());
        }
        check_dimension(self.dimension, vector.len())?;
        self.vectors.insert(id, vector.to_vec());
        Ok(())
    }

    fn delete(&mut self, id: ChunkId) -> Result<()> {
        if self.vectors.remove(&id).is_none() {
            return Err(NotFoundError::chunk(id).into());
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.vectors.clear();
        self.dimension = None;
    }

    fn search(&mut self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        check_dimension(self.dimension, query.len())?;

        let metric = self.config.metric;
        let scored: Vec<ScoredId> = self
            .vectors
            .iter()
            .map(|(id, vector)| (*id, metric.score(query, vector)))
            .collect();
        Ok(rank_top_k(scored, k))
    }

    fn build(&mut self) -> Result<()> {
        // Exhaustive scan needs no precomputed structure.
        Ok(())
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn is_built(&self) -> bool {
        true
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Metric;

    fn flat(metric: Metric) -> FlatIndex {
        FlatIndex::new(IndexConfig::with_metric(metric))
    }

    #[test]
    fn test_add_fixes_dimension() {
        let mut index = flat(Metric::Cosine);
        index.add(ChunkId::new(), &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(index.dimension(), Some(3));

        let err = index.add(ChunkId::new(), &[1.0, 0.0]).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_update_existing_vector() {
        let mut index = flat(Metric::Cosine);
        let id = ChunkId::new();
        index.add(id, &[1.0, 0.0, 0.0]).unwrap();
        index.update(id, &[0.0, 1.0, 0.0]).unwrap();

        let results = index.search(&[0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0, id);
        assert!((results[0].1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_update_nonexistent_is_not_found() {
        let mut index = flat(Metric::Cosine);
        index.add(ChunkId::new(), &[1.0, 2.0, 3.0]).unwrap();
        let err = index.update(ChunkId::new(), &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_nonexistent_is_not_found() {
        let mut index = flat(Metric::Cosine);
        let err = index.delete(ChunkId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_removes_from_results() {
        let mut index = flat(Metric::Cosine);
        let id1 = ChunkId::new();
        let id2 = ChunkId::new();
        index.add(id1, &[1.0, 0.0]).unwrap();
        index.add(id2, &[0.0, 1.0]).unwrap();

        index.delete(id2).unwrap();
        assert_eq!(index.len(), 1);

        let results = index.search(&[0.0, 1.0], 5).unwrap();
        assert!(results.iter().all(|(id, _)| *id != id2));
    }

    #[test]
    fn test_clear_resets_dimension() {
        let mut index = flat(Metric::Cosine);
        index.add(ChunkId::new(), &[1.0, 0.0]).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
        // A different dimension is acceptable after clear
        index.add(ChunkId::new(), &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(index.dimension(), Some(3));
    }

    #[test]
    fn test_cosine_search_ordering() {
        let mut index = flat(Metric::Cosine);
        let id1 = ChunkId::new(); // perfect match
        let id2 = ChunkId::new(); // 45 degrees
        let id3 = ChunkId::new(); // orthogonal
        let id4 = ChunkId::new(); // opposite
        index.add(id1, &[1.0, 0.0, 0.0]).unwrap();
        index.add(id2, &[1.0, 1.0, 0.0]).unwrap();
        index.add(id3, &[0.0, 1.0, 0.0]).unwrap();
        index.add(id4, &[-1.0, 0.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 4).unwrap();
        let ids: Vec<ChunkId> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![id1, id2, id3, id4]);

        assert!((results[0].1 - 1.0).abs() < 1e-5);
        assert!(results[1].1 > 0.7 && results[1].1 < 0.8); // cos(45°) ≈ 0.707
        assert!(results[2].1.abs() < 1e-5);
        assert!((results[3].1 + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_euclidean_scores_are_negated_distances() {
        let mut index = flat(Metric::Euclidean);
        let origin = ChunkId::new();
        let far = ChunkId::new();
        index.add(origin, &[0.0, 0.0]).unwrap();
        index.add(far, &[3.0, 4.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0, origin);
        assert!(results[0].1.abs() < 1e-5);
        assert_eq!(results[1].0, far);
        assert!((results[1].1 + 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_dot_product_search() {
        let mut index = flat(Metric::DotProduct);
        let id1 = ChunkId::new();
        let id2 = ChunkId::new();
        index.add(id1, &[2.0, 0.0, 0.0]).unwrap();
        index.add(id2, &[1.0, 1.0, 1.0]).unwrap();

        // dot([1,1,1], id1)=2, dot([1,1,1], id2)=3
        let results = index.search(&[1.0, 1.0, 1.0], 2).unwrap();
        assert_eq!(results[0].0, id2);
        assert!((results[0].1 - 3.0).abs() < 1e-5);
        assert_eq!(results[1].0, id1);
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let mut index = flat(Metric::Cosine);
        assert!(index.search(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_k_larger_than_len() {
        let mut index = flat(Metric::Cosine);
        for i in 0..3 {
            index.add(ChunkId::new(), &[i as f32, 1.0]).unwrap();
        }
        assert_eq!(index.search(&[1.0, 1.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn test_search_k_zero() {
        let mut index = flat(Metric::Cosine);
        index.add(ChunkId::new(), &[1.0, 2.0]).unwrap();
        assert!(index.search(&[1.0, 2.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_wrong_dimension() {
        let mut index = flat(Metric::Cosine);
        index.add(ChunkId::new(), &[1.0, 2.0, 3.0]).unwrap();
        let err = index.search(&[1.0, 2.0], 1).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_equal_scores_tie_break_by_id() {
        let mut index = flat(Metric::DotProduct);
        let mut ids = [ChunkId::new(), ChunkId::new(), ChunkId::new()];
        ids.sort();
        // Insert in reverse order; identical vectors give identical scores
        for id in ids.iter().rev() {
            index.add(*id, &[1.0, 1.0]).unwrap();
        }
        let results = index.search(&[1.0, 1.0], 3).unwrap();
        let returned: Vec<ChunkId> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(returned, ids.to_vec());
    }
}
