//! Similarity metrics for vector scoring.
//!
//! All three metrics are normalized so that a **larger score means more
//! similar** at the pipeline boundary: euclidean distance is negated, and
//! cosine of a zero-norm operand is reported as 0.0 rather than NaN.

use serde::{Deserialize, Serialize};

/// Scoring function applied between a query and stored vectors.
///
/// Selected per library via the index configuration (`metric` key).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cosine similarity: `dot(a,b) / (‖a‖·‖b‖)`.
    ///
    /// Reported as 0.0 when either norm is zero.
    #[default]
    Cosine,

    /// Negated Euclidean distance: `-‖a−b‖`, so closer vectors rank higher.
    Euclidean,

    /// Raw dot product.
    DotProduct,
}

impl Metric {
    /// Scores `a` against `b`. Both slices must have equal length;
    /// callers validate dimensions before scoring.
    #[inline]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::Euclidean => -euclidean_distance(a, b),
            Metric::DotProduct => dot_product(a, b),
        }
    }

    /// Returns the wire token for this metric (`cosine`, `euclidean`,
    /// `dot_product`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dot_product",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dot product of two equal-length vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) distance between two equal-length vectors.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    l2_distance_squared(a, b).sqrt()
}

/// Squared L2 distance. Avoids the sqrt where only ordering matters
/// (k-means assignment and convergence checks).
#[inline]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Cosine similarity, 0.0 when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
