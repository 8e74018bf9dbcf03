//! Inverted-file (IVFFLAT) index with k-means clustering.
//!
//! The index keeps two views of the data:
//!
//! - `vectors`: the flat `id → vector` mapping (full-fidelity storage)
//! - `clusters`: per-centroid candidate lists, present once built
//!
//! # State machine
//!
//! `Empty` → (add) → `Pending` → (build) → `Built`. While `Built`,
//! `add`/`update`/`delete` maintain cluster membership incrementally
//! without recomputing centroids. `clear()` returns to `Empty`. An
//! explicit `build()` from `Built` re-clusters from scratch.
//!
//! # Clustering
//!
//! Lloyd's k-means over the full embedding set: [`KMEANS_RESTARTS`]
//! random-seeded initializations derived from a fixed base seed (searches
//! are reproducible across processes), at most [`KMEANS_MAX_ITERATIONS`]
//! iterations each, best total inertia wins. Cluster population and query
//! probing both use the configured metric; k-means itself runs in L2.
//!
//! Expected search cost: O(nlist·d + nprobe·(n/nlist)·d). Recall is
//! approximate; the integration suite checks ≥80% against the flat
//! baseline at nprobe ≥ 0.10·nlist on well-separated data.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{NotFoundError, Result};
use crate::types::ChunkId;
use crate::vector::metric::l2_distance_squared;

use super::{check_dimension, rank_top_k, IndexConfig, ScoredId, VectorIndex};

/// Base seed for k-means initialization. Restart `i` uses `seed + i`.
const KMEANS_SEED: u64 = 42;

/// Number of random-seeded k-means initializations per build.
const KMEANS_RESTARTS: usize = 10;

/// Iteration cap per k-means run.
const KMEANS_MAX_ITERATIONS: usize = 300;

/// Convergence tolerance on centroid movement (compared squared).
const KMEANS_TOLERANCE: f32 = 1e-4;

/// Datasets smaller than this default to a single cluster.
const SMALL_DATASET_THRESHOLD: usize = 10;

/// Approximate nearest-neighbor index over k-means partitions.
#[derive(Debug)]
pub struct IvfIndex {
    config: IndexConfig,
    dimension: Option<usize>,
    vectors: BTreeMap<ChunkId, Vec<f32>>,
    clusters: Vec<Vec<(ChunkId, Vec<f32>)>>,
    centroids: Vec<Vec<f32>>,
    built: bool,
}

impl IvfIndex {
    /// Creates an empty IVF index. The dimension is fixed by the first add.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            dimension: None,
            vectors: BTreeMap::new(),
            clusters: Vec::new(),
            centroids: Vec::new(),
            built: false,
        }
    }

    /// Default cluster count: `floor(sqrt(n))`, or 1 for small datasets.
    fn default_nlist(&self) -> usize {
        let n = self.vectors.len();
        if n < SMALL_DATASET_THRESHOLD {
            1
        } else {
            ((n as f64).sqrt().floor() as usize).max(1)
        }
    }

    /// Effective cluster count for a build over the current dataset:
    /// the configured (or derived) nlist clamped to `[1, n]`.
    fn effective_nlist(&self) -> usize {
        let n = self.vectors.len();
        self.config
            .nlist
            .unwrap_or_else(|| self.default_nlist())
            .clamp(1, n.max(1))
    }

    /// Index of the centroid most similar to `vector` under the configured
    /// metric. Ties resolve to the lowest cluster index. Returns `None`
    /// when no centroids exist (degenerate built-empty state).
    fn nearest_cluster(&self, vector: &[f32]) -> Option<usize> {
        let metric = self.config.metric;
        let mut best: Option<(usize, f32)> = None;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let score = metric.score(vector, centroid);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Removes `id` from whichever cluster currently holds it.
    /// Empty clusters are retained in the structure; search skips them.
    fn remove_from_clusters(&mut self, id: ChunkId) {
        for cluster in &mut self.clusters {
            if let Some(pos) = cluster.iter().position(|(cid, _)| *cid == id) {
                cluster.swap_remove(pos);
                return;
            }
        }
    }
}

impl VectorIndex for IvfIndex {
    fn add(&mut self, id: ChunkId, vector: &[f32]) -> Result<()> {
        check_dimension(self.dimension, vector.len())?;
        self.dimension.get_or_insert(vector.len());
        self.vectors.insert(id, vector.to_vec());

        if self.built {
            match self.nearest_cluster(vector) {
                Some(cluster) => self.clusters[cluster].push((id, vector.to_vec())),
                // Degenerate built-empty state has no centroids to assign
                // against; fall back to Pending so the next search rebuilds.
                None => self.built = false,
            }
        }
        Ok(())
    }

    fn bulk_add(&mut self, items: &[(ChunkId, Vec<f32>)]) -> Result<()> {
        for (id, vector) in items {
            self.add(*id, vector)?;
        }
        Ok(())
    }

    fn update(&mut self, id: ChunkId, vector: &[f32]) -> Result<()> {
        if !self.vectors.contains_key(&id) {
            return Err(NotFoundError::chunk(id).into());
        }
        check_dimension(self.dimension, vector.len())?;
        // Delete-then-add: the id may move to a different cluster.
        self.delete(id)?;
        self.add(id, vector)
    }

    fn delete(&mut self, id: ChunkId) -> Result<()> {
        if self.vectors.remove(&id).is_none() {
            return Err(NotFoundError::chunk(id).into());
        }
        if self.built {
            self.remove_from_clusters(id);
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.vectors.clear();
        self.clusters.clear();
        self.centroids.clear();
        self.dimension = None;
        self.built = false;
    }

    fn search(&mut self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        if !self.built {
            self.build()?;
        }
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        check_dimension(self.dimension, query.len())?;

        let metric = self.config.metric;
        let nlist = self.centroids.len();
        let nprobe = self.config.nprobe.unwrap_or(1).min(nlist);

        // Rank non-empty clusters by centroid similarity, ties by index.
        let mut cluster_scores: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.clusters[*idx].is_empty())
            .map(|(idx, centroid)| (idx, metric.score(query, centroid)))
            .collect();
        cluster_scores.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        cluster_scores.truncate(nprobe);

        let scored: Vec<ScoredId> = cluster_scores
            .iter()
            .flat_map(|(idx, _)| self.clusters[*idx].iter())
            .map(|(id, vector)| (*id, metric.score(query, vector)))
            .collect();
        Ok(rank_top_k(scored, k))
    }

    fn build(&mut self) -> Result<()> {
        self.clusters.clear();
        self.centroids.clear();

        if self.vectors.is_empty() {
            // Degenerate state: built with nlist=0, answers every query empty.
            self.built = true;
            return Ok(());
        }
        let Some(dim) = self.dimension else {
            self.built = true;
            return Ok(());
        };

        let nlist = self.effective_nlist();
        let data: Vec<&[f32]> = self.vectors.values().map(Vec::as_slice).collect();
        self.centroids = train_centroids(&data, dim, nlist);
        self.clusters = vec![Vec::new(); self.centroids.len()];

        let assignments: Vec<(ChunkId, Vec<f32>, usize)> = self
            .vectors
            .iter()
            .filter_map(|(id, vector)| {
                self.nearest_cluster(vector)
                    .map(|cluster| (*id, vector.clone(), cluster))
            })
            .collect();
        for (id, vector, cluster) in assignments {
            self.clusters[cluster].push((id, vector));
        }

        self.built = true;
        tracing::debug!(
            vectors = self.vectors.len(),
            nlist = self.centroids.len(),
            "IVF index built"
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

/// Trains `k` centroids over `data`, returning the restart with the lowest
/// total inertia. Deterministic: restart `i` seeds its RNG with
/// `KMEANS_SEED + i`.
fn train_centroids(data: &[&[f32]], dim: usize, k: usize) -> Vec<Vec<f32>> {
    let mut best: Option<(f32, Vec<Vec<f32>>)> = None;
    for restart in 0..KMEANS_RESTARTS {
        let seed = KMEANS_SEED.wrapping_add(restart as u64);
        let centroids = lloyd_kmeans(data, dim, k, seed);
        let inertia = total_inertia(data, &centroids);
        let improved = best
            .as_ref()
            .map_or(true, |(best_inertia, _)| inertia < *best_inertia);
        if improved {
            best = Some((inertia, centroids));
        }
    }
    best.map(|(_, centroids)| centroids).unwrap_or_default()
}

/// Standard Lloyd's k-means with k-means++ initialization.
fn lloyd_kmeans(data: &[&[f32]], dim: usize, k: usize, seed: u64) -> Vec<Vec<f32>> {
    let n = data.len();
    let k = k.min(n);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut centroids = kmeans_plus_plus_init(data, k, &mut rng);
    let mut assignments = vec![0usize; n];
    let mut counts = vec![0usize; k];

    for _ in 0..KMEANS_MAX_ITERATIONS {
        // Assignment step: nearest centroid by squared L2.
        for (i, point) in data.iter().enumerate() {
            let mut best_c = 0;
            let mut best_dist = f32::MAX;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = l2_distance_squared(point, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best_c = c;
                }
            }
            assignments[i] = best_c;
        }

        // Update step: centroid = mean of assigned points.
        let mut new_centroids = vec![vec![0.0f32; dim]; k];
        counts.fill(0);
        for (i, point) in data.iter().enumerate() {
            let c = assignments[i];
            counts[c] += 1;
            for (acc, value) in new_centroids[c].iter_mut().zip(point.iter()) {
                *acc += value;
            }
        }
        for (c, centroid) in new_centroids.iter_mut().enumerate() {
            if counts[c] > 0 {
                let count = counts[c] as f32;
                for value in centroid.iter_mut() {
                    *value /= count;
                }
            } else {
                // Dead centroid: reseed from a random data point.
                let idx = rng.gen_range(0..n);
                centroid.copy_from_slice(data[idx]);
            }
        }

        // Convergence: max centroid movement below tolerance.
        let mut max_movement = 0.0f32;
        for (old, new) in centroids.iter().zip(new_centroids.iter()) {
            let movement = l2_distance_squared(old, new);
            if movement > max_movement {
                max_movement = movement;
            }
        }
        centroids = new_centroids;
        if max_movement < KMEANS_TOLERANCE * KMEANS_TOLERANCE {
            break;
        }
    }

    centroids
}

/// K-means++ initialization: each subsequent centroid is sampled with
/// probability proportional to its squared distance from the nearest
/// already-chosen centroid.
fn kmeans_plus_plus_init(data: &[&[f32]], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = data.len();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    let first = rng.gen_range(0..n);
    centroids.push(data[first].to_vec());

    let mut min_dists = vec![f32::MAX; n];
    while centroids.len() < k {
        let last = &centroids[centroids.len() - 1];
        for (i, point) in data.iter().enumerate() {
            let d = l2_distance_squared(point, last);
            if d < min_dists[i] {
                min_dists[i] = d;
            }
        }

        let total: f64 = min_dists.iter().map(|&d| d as f64).sum();
        if total <= 0.0 {
            // All points coincide with a centroid already; pick at random.
            let idx = rng.gen_range(0..n);
            centroids.push(data[idx].to_vec());
            continue;
        }

        let threshold: f64 = rng.gen::<f64>() * total;
        let mut cumulative = 0.0f64;
        let mut chosen = n - 1;
        for (i, &d) in min_dists.iter().enumerate() {
            cumulative += d as f64;
            if cumulative >= threshold {
                chosen = i;
                break;
            }
        }
        centroids.push(data[chosen].to_vec());
    }

    centroids
}

/// Sum of squared distances from each point to its nearest centroid.
fn total_inertia(data: &[&[f32]], centroids: &[Vec<f32>]) -> f32 {
    data.iter()
        .map(|point| {
            centroids
                .iter()
                .map(|centroid| l2_distance_squared(point, centroid))
                .fold(f32::MAX, f32::min)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Metric;

    fn ivf(nlist: Option<usize>, nprobe: Option<usize>) -> IvfIndex {
        IvfIndex::new(IndexConfig {
            metric: Metric::Cosine,
            nlist,
            nprobe,
        })
    }

    fn axis_vectors() -> Vec<(ChunkId, Vec<f32>)> {
        vec![
            (ChunkId::new(), vec![1.0, 0.0, 0.0]),
            (ChunkId::new(), vec![1.0, 0.1, 0.0]),
            (ChunkId::new(), vec![0.0, 1.0, 0.0]),
            (ChunkId::new(), vec![0.0, 0.0, 1.0]),
        ]
    }

    #[test]
    fn test_new_index_is_unbuilt() {
        let index = ivf(None, None);
        assert!(!index.is_built());
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_add_transitions_to_pending() {
        let mut index = ivf(None, None);
        index.add(ChunkId::new(), &[1.0, 2.0, 3.0]).unwrap();
        assert!(!index.is_built());
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), Some(3));
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let mut index = ivf(None, None);
        index.add(ChunkId::new(), &[1.0, 2.0, 3.0]).unwrap();
        let err = index.add(ChunkId::new(), &[1.0, 2.0]).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_default_nlist_small_dataset() {
        let mut index = ivf(None, None);
        for i in 0..5 {
            index.add(ChunkId::new(), &[i as f32, 0.0, 0.0]).unwrap();
        }
        assert_eq!(index.default_nlist(), 1);
    }

    #[test]
    fn test_default_nlist_medium_dataset() {
        let mut index = ivf(None, None);
        for i in 0..100 {
            index.add(ChunkId::new(), &[i as f32, 0.0]).unwrap();
        }
        assert_eq!(index.default_nlist(), 10); // sqrt(100)
    }

    #[test]
    fn test_default_nlist_large_dataset() {
        let mut index = ivf(None, None);
        for i in 0..10_000 {
            index.vectors.insert(ChunkId::new(), vec![i as f32]);
        }
        assert_eq!(index.default_nlist(), 100); // sqrt(10000)
    }

    #[test]
    fn test_effective_nlist_clamped_to_n() {
        let mut index = ivf(Some(50), None);
        for i in 0..4 {
            index.add(ChunkId::new(), &[i as f32, 0.0]).unwrap();
        }
        assert_eq!(index.effective_nlist(), 4);
    }

    #[test]
    fn test_build_populates_clusters() {
        let mut index = ivf(Some(2), Some(1));
        for (id, vector) in axis_vectors() {
            index.add(id, &vector).unwrap();
        }
        index.build().unwrap();

        assert!(index.is_built());
        assert_eq!(index.centroids.len(), 2);
        let clustered: usize = index.clusters.iter().map(Vec::len).sum();
        assert_eq!(clustered, index.len());
    }

    #[test]
    fn test_build_on_empty_is_degenerate_built() {
        let mut index = ivf(None, None);
        index.build().unwrap();
        assert!(index.is_built());
        assert!(index.search(&[1.0, 2.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_triggers_lazy_build() {
        let mut index = ivf(Some(2), Some(2));
        for (id, vector) in axis_vectors() {
            index.add(id, &vector).unwrap();
        }
        assert!(!index.is_built());

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert!(index.is_built());
        assert!(results.len() <= 2);
        assert!(!results.is_empty());
    }

    #[test]
    fn test_search_with_nprobe_one_probes_single_cluster() {
        let mut index = ivf(Some(2), Some(1));
        let vectors = axis_vectors();
        let near_ids = [vectors[0].0, vectors[1].0];
        for (id, vector) in &vectors {
            index.add(*id, vector).unwrap();
        }

        // The probed cluster must be the one nearest [1,0,0]; results stay
        // inside it.
        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert!(!results.is_empty());
        for (id, _) in &results {
            assert!(near_ids.contains(id), "result escaped the probed cluster");
        }
    }

    #[test]
    fn test_nprobe_exceeding_nlist_is_clamped() {
        let mut index = ivf(Some(2), Some(100));
        for (id, vector) in axis_vectors() {
            index.add(id, &vector).unwrap();
        }
        // With every cluster probed, the result is exact top-2.
        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        for window in results.windows(2) {
            assert!(window[0].1 >= window[1].1);
        }
    }

    #[test]
    fn test_incremental_add_while_built() {
        let mut index = ivf(Some(2), Some(2));
        for (id, vector) in axis_vectors() {
            index.add(id, &vector).unwrap();
        }
        index.build().unwrap();
        let centroids_before = index.centroids.clone();

        let new_id = ChunkId::new();
        index.add(new_id, &[0.9, 0.05, 0.0]).unwrap();

        // Still built, centroids untouched, new id queryable.
        assert!(index.is_built());
        assert_eq!(index.centroids, centroids_before);
        let results = index.search(&[0.9, 0.05, 0.0], 1).unwrap();
        assert_eq!(results[0].0, new_id);
    }

    #[test]
    fn test_delete_while_built() {
        let mut index = ivf(Some(2), Some(2));
        let vectors = axis_vectors();
        for (id, vector) in &vectors {
            index.add(*id, vector).unwrap();
        }
        index.build().unwrap();

        index.delete(vectors[0].0).unwrap();
        assert!(index.is_built());
        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 4).unwrap();
        assert!(results.iter().all(|(id, _)| *id != vectors[0].0));
    }

    #[test]
    fn test_update_moves_between_clusters() {
        let mut index = ivf(Some(2), Some(1));
        let vectors = axis_vectors();
        let moved = vectors[3].0;
        for (id, vector) in &vectors {
            index.add(*id, vector).unwrap();
        }
        index.build().unwrap();

        // Move the z-axis vector next to the x-axis group; probing the
        // x cluster must now find it.
        index.update(moved, &[1.0, 0.05, 0.0]).unwrap();
        let results = index.search(&[1.0, 0.0, 0.0], 4).unwrap();
        assert!(results.iter().any(|(id, _)| *id == moved));
    }

    #[test]
    fn test_update_nonexistent_is_not_found() {
        let mut index = ivf(None, None);
        index.add(ChunkId::new(), &[1.0, 0.0]).unwrap();
        let err = index.update(ChunkId::new(), &[1.0, 0.0]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_nonexistent_is_not_found() {
        let mut index = ivf(None, None);
        let err = index.delete(ChunkId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_clear_returns_to_empty() {
        let mut index = ivf(Some(2), None);
        for (id, vector) in axis_vectors() {
            index.add(id, &vector).unwrap();
        }
        index.build().unwrap();
        index.clear();

        assert!(!index.is_built());
        assert!(index.is_empty());
        assert!(index.centroids.is_empty());
        assert!(index.clusters.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let mut index = ivf(Some(3), Some(3));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..60 {
            let v: Vec<f32> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
            index.add(ChunkId::new(), &v).unwrap();
        }

        let query: Vec<f32> = vec![0.3, -0.2, 0.9, 0.1];
        index.build().unwrap();
        let first = index.search(&query, 10).unwrap();
        index.build().unwrap();
        let second = index.search(&query, 10).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_add_after_degenerate_build_recovers() {
        let mut index = ivf(None, None);
        index.build().unwrap();
        assert!(index.is_built());

        // No centroids exist to assign against; the index falls back to
        // Pending and the next search rebuilds.
        let id = ChunkId::new();
        index.add(id, &[1.0, 0.0]).unwrap();
        assert!(!index.is_built());

        let results = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0, id);
    }

    #[test]
    fn test_search_wrong_dimension() {
        let mut index = ivf(None, None);
        index.add(ChunkId::new(), &[1.0, 0.0, 0.0]).unwrap();
        let err = index.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_kmeans_separates_obvious_clusters() {
        // Two tight groups far apart; k=2 must put one centroid near each.
        let group_a: Vec<Vec<f32>> = (0..10).map(|i| vec![10.0 + i as f32 * 0.01, 0.0]).collect();
        let group_b: Vec<Vec<f32>> = (0..10).map(|i| vec![-10.0 - i as f32 * 0.01, 0.0]).collect();
        let data: Vec<&[f32]> = group_a
            .iter()
            .chain(group_b.iter())
            .map(Vec::as_slice)
            .collect();

        let centroids = train_centroids(&data, 2, 2);
        assert_eq!(centroids.len(), 2);
        let signs: Vec<bool> = centroids.iter().map(|c| c[0] > 0.0).collect();
        assert_ne!(signs[0], signs[1], "centroids collapsed onto one group");
    }
}
