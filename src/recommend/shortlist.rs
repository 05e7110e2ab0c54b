//! Candidate shortlisting.
//!
//! Given seed rows in the normalized feature space, compute the (optionally
//! weighted) centroid, rank every other row by Euclidean distance to it, and
//! narrow to a bounded candidate pool. Seed rows are forced to infinite
//! distance so a track can never surface as its own recommendation.

use crate::catalog::FEATURE_DIMENSIONS;
use crate::features::FeatureMatrix;

/// Candidate pool sizing: six candidates per requested result, at least 60.
pub fn candidate_pool_size(limit: usize) -> usize {
    (limit * 6).max(60)
}

#[derive(Debug, Clone, Copy)]
pub struct ShortlistEntry {
    /// Catalog / matrix row index.
    pub row: usize,
    /// Euclidean distance to the seed centroid in normalized space.
    pub distance: f64,
}

/// Normalize per-seed weights to sum to 1. Negative weights are treated as
/// 0; when nothing positive remains the distribution falls back to uniform.
pub fn normalize_seed_weights(count: usize, weights: Option<&[f64]>) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / count as f64;
    let weights = match weights {
        Some(weights) if weights.len() == count => weights,
        _ => return vec![uniform; count],
    };
    let clamped: Vec<f64> = weights.iter().map(|weight| weight.max(0.0)).collect();
    let sum: f64 = clamped.iter().sum();
    if sum <= 0.0 {
        return vec![uniform; count];
    }
    clamped.into_iter().map(|weight| weight / sum).collect()
}

/// Weighted mean of the seeds' normalized feature rows.
pub fn weighted_centroid(
    matrix: &FeatureMatrix,
    seed_rows: &[usize],
    weights: Option<&[f64]>,
) -> [f64; FEATURE_DIMENSIONS] {
    let normalized = normalize_seed_weights(seed_rows.len(), weights);
    let mut centroid = [0.0; FEATURE_DIMENSIONS];
    for (&row, &weight) in seed_rows.iter().zip(normalized.iter()) {
        let features = matrix.row(row);
        for column in 0..FEATURE_DIMENSIONS {
            centroid[column] += features[column] * weight;
        }
    }
    centroid
}

fn euclidean_distance(a: &[f64; FEATURE_DIMENSIONS], b: &[f64; FEATURE_DIMENSIONS]) -> f64 {
    let mut sum = 0.0;
    for column in 0..FEATURE_DIMENSIONS {
        let delta = a[column] - b[column];
        sum += delta * delta;
    }
    sum.sqrt()
}

/// Shortlist the closest non-seed rows to the seed centroid.
///
/// Returns at most `candidate_pool_size(limit)` entries ordered by ascending
/// distance (ties broken by row index). The full catalog is never sorted;
/// a partial selection narrows to the pool first. Non-finite distances are
/// discarded, so the result can be empty when the seeds cover the whole
/// catalog.
pub fn shortlist(
    matrix: &FeatureMatrix,
    seed_rows: &[usize],
    weights: Option<&[f64]>,
    limit: usize,
) -> Vec<ShortlistEntry> {
    if seed_rows.is_empty() || matrix.is_empty() {
        return Vec::new();
    }

    let centroid = weighted_centroid(matrix, seed_rows, weights);

    let mut distances = vec![0.0f64; matrix.len()];
    for (row, slot) in distances.iter_mut().enumerate() {
        *slot = euclidean_distance(matrix.row(row), &centroid);
    }
    for &seed in seed_rows {
        distances[seed] = f64::INFINITY;
    }

    let pool = candidate_pool_size(limit).min(matrix.len());
    let mut order: Vec<usize> = (0..matrix.len()).collect();
    if pool < order.len() {
        order.select_nth_unstable_by(pool, |&a, &b| distances[a].total_cmp(&distances[b]));
        order.truncate(pool);
    }

    let mut entries: Vec<ShortlistEntry> = order
        .into_iter()
        .filter(|&row| distances[row].is_finite())
        .map(|row| ShortlistEntry {
            row,
            distance: distances[row],
        })
        .collect();
    entries.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
    entries.truncate(pool);
    entries
}
