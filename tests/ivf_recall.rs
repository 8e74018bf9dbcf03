//! Statistical recall tests for the IVF index against the flat baseline.
//!
//! Vectors are drawn from a well-separated mixture of Gaussians with a
//! seeded RNG, so the checks are deterministic. The contract: with
//! `nprobe >= 0.10 * nlist`, recall@k must reach at least 0.80 relative
//! to exhaustive search.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratadb::{
    Config, IndexConfig, IndexKind, LibraryId, Metric, NewChunk, NewDocument, NewLibrary, StrataDB,
};

const DIM: usize = 8;
const CLUSTERS: usize = 5;
const POINTS_PER_CLUSTER: usize = 60;

/// Cluster centers spread far apart on coordinate axes.
fn cluster_center(cluster: usize) -> Vec<f32> {
    let mut center = vec![0.0; DIM];
    center[cluster % DIM] = 20.0 * (1.0 + (cluster / DIM) as f32);
    center
}

/// Draws the full mixture dataset with small isotropic noise.
fn mixture(rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut points = Vec::with_capacity(CLUSTERS * POINTS_PER_CLUSTER);
    for cluster in 0..CLUSTERS {
        let center = cluster_center(cluster);
        for _ in 0..POINTS_PER_CLUSTER {
            let point: Vec<f32> = center
                .iter()
                .map(|c| c + rng.gen_range(-1.0..1.0))
                .collect();
            points.push(point);
        }
    }
    points
}

/// Loads the same points (tagged by index in the text) into a library of
/// the given kind, returning the library id.
fn load_library(db: &StrataDB, kind: IndexKind, config: IndexConfig, points: &[Vec<f32>]) -> LibraryId {
    let library = db
        .create_library(NewLibrary {
            name: format!("{}-recall", kind),
            index_kind: kind,
            index_config: config,
            ..Default::default()
        })
        .unwrap();
    let document = db
        .create_document(NewDocument::new(library.id, "points"))
        .unwrap();
    let batch: Vec<NewChunk> = points
        .iter()
        .enumerate()
        .map(|(i, point)| NewChunk::new(document.id, format!("p{}", i), point.clone()))
        .collect();
    db.create_chunks_bulk(batch).unwrap();
    library.id
}

/// Top-k point labels (the `p<i>` text tags) for a query.
fn top_k_labels(db: &StrataDB, library_id: LibraryId, query: &[f32], k: usize) -> Vec<String> {
    db.search(library_id, query, k)
        .unwrap()
        .results
        .into_iter()
        .map(|r| r.chunk.text)
        .collect()
}

#[test]
fn test_ivf_recall_at_10_exceeds_080() {
    let mut rng = StdRng::seed_from_u64(1234);
    let points = mixture(&mut rng);

    let db = StrataDB::open(Config::default()).unwrap();
    let flat = load_library(
        &db,
        IndexKind::Flat,
        IndexConfig::with_metric(Metric::Euclidean),
        &points,
    );
    // nlist = 10, nprobe = 2 → nprobe / nlist = 0.2 >= 0.10
    let ivf = load_library(
        &db,
        IndexKind::Ivf,
        IndexConfig {
            metric: Metric::Euclidean,
            nlist: Some(10),
            nprobe: Some(2),
        },
        &points,
    );

    let k = 10;
    let query_count = 20;
    let mut hits = 0usize;
    for q in 0..query_count {
        // Queries land near cluster centers, like real lookups would.
        let center = cluster_center(q % CLUSTERS);
        let query: Vec<f32> = center
            .iter()
            .map(|c| c + rng.gen_range(-1.0..1.0))
            .collect();

        let exact = top_k_labels(&db, flat, &query, k);
        let approx = top_k_labels(&db, ivf, &query, k);
        hits += approx.iter().filter(|label| exact.contains(label)).count();
    }

    let recall = hits as f64 / (query_count * k) as f64;
    assert!(
        recall >= 0.80,
        "recall@{} was {:.3}, expected >= 0.80",
        k,
        recall
    );
}

#[test]
fn test_ivf_with_full_probe_matches_flat_exactly() {
    let mut rng = StdRng::seed_from_u64(99);
    let points = mixture(&mut rng);

    let db = StrataDB::open(Config::default()).unwrap();
    let flat = load_library(
        &db,
        IndexKind::Flat,
        IndexConfig::with_metric(Metric::Euclidean),
        &points,
    );
    // Probing every cluster degenerates to an exhaustive scan.
    let ivf = load_library(
        &db,
        IndexKind::Ivf,
        IndexConfig {
            metric: Metric::Euclidean,
            nlist: Some(8),
            nprobe: Some(8),
        },
        &points,
    );

    for q in 0..5 {
        let query = cluster_center(q % CLUSTERS);
        assert_eq!(
            top_k_labels(&db, flat, &query, 10),
            top_k_labels(&db, ivf, &query, 10),
        );
    }
}

#[test]
fn test_ivf_nlist_one_degenerates_to_flat() {
    let mut rng = StdRng::seed_from_u64(7);
    let points = mixture(&mut rng);

    let db = StrataDB::open(Config::default()).unwrap();
    let flat = load_library(
        &db,
        IndexKind::Flat,
        IndexConfig::with_metric(Metric::Cosine),
        &points,
    );
    let ivf = load_library(
        &db,
        IndexKind::Ivf,
        IndexConfig {
            metric: Metric::Cosine,
            nlist: Some(1),
            nprobe: Some(1),
        },
        &points,
    );

    let query = cluster_center(2);
    assert_eq!(
        top_k_labels(&db, flat, &query, 10),
        top_k_labels(&db, ivf, &query, 10),
    );
}

#[test]
fn test_rebuild_after_mutations_is_consistent() {
    let mut rng = StdRng::seed_from_u64(55);
    let points = mixture(&mut rng);

    let db = StrataDB::open(Config::default()).unwrap();
    let ivf = load_library(
        &db,
        IndexKind::Ivf,
        IndexConfig {
            metric: Metric::Euclidean,
            nlist: Some(10),
            nprobe: Some(10),
        },
        &points,
    );
    db.build_index(ivf).unwrap();

    let query = cluster_center(1);
    let before = top_k_labels(&db, ivf, &query, 10);

    // build() from Built re-clusters; with the fixed seed and unchanged
    // data the ranked results are identical.
    db.build_index(ivf).unwrap();
    let after = top_k_labels(&db, ivf, &query, 10);
    assert_eq!(before, after);
}
