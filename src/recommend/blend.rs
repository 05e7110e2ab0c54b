//! Local multi-signal blend.
//!
//! For each shortlisted candidate, three independent [0,1] components are
//! combined with fixed weights: feature-distance similarity (0.6), genre
//! Jaccard overlap against the seed union (0.3), and popularity proximity
//! to the seed mean (0.1).
//!
//! Missing-value rules differ per signal and are intentional: a candidate
//! with no popularity is imputed to the seed mean (perfect proximity, since
//! there is no ground truth to penalize), while the genre component is an
//! explicit 0.0 whenever either side has no genres.

use super::shortlist::ShortlistEntry;
use crate::features::FeatureMatrix;
use serde::Serialize;
use std::collections::HashSet;

pub const FEATURE_WEIGHT: f64 = 0.6;
pub const GENRE_WEIGHT: f64 = 0.3;
pub const POPULARITY_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlendComponents {
    pub feature: f64,
    pub genre: f64,
    pub popularity: f64,
}

#[derive(Debug, Clone)]
pub struct BlendedCandidate {
    /// Catalog / matrix row index.
    pub row: usize,
    pub score: f64,
    pub components: BlendComponents,
}

/// Jaccard similarity of two genre sets. Defined as 0.0 (not undefined)
/// when either set is empty, including when both are.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Blend the candidate pool against the seeds and keep the top `limit`
/// by combined score. Exact score ties break by URI lexical order.
pub fn blend(
    matrix: &FeatureMatrix,
    seed_rows: &[usize],
    pool: &[ShortlistEntry],
    limit: usize,
) -> Vec<BlendedCandidate> {
    if pool.is_empty() || seed_rows.is_empty() {
        return Vec::new();
    }

    let mut seed_genres: HashSet<String> = HashSet::new();
    for &seed in seed_rows {
        seed_genres.extend(matrix.genre_set(seed).iter().cloned());
    }

    let known_popularity: Vec<f64> = seed_rows
        .iter()
        .filter_map(|&seed| matrix.popularity(seed))
        .collect();
    let seed_popularity_mean = if known_popularity.is_empty() {
        None
    } else {
        Some(known_popularity.iter().sum::<f64>() / known_popularity.len() as f64)
    };

    let mut candidates: Vec<BlendedCandidate> = pool
        .iter()
        .map(|entry| {
            let feature = (1.0 / (1.0 + entry.distance)).clamp(0.0, 1.0);
            let genre = jaccard_similarity(&seed_genres, matrix.genre_set(entry.row));
            let popularity = match seed_popularity_mean {
                Some(mean) => {
                    let candidate = matrix.popularity(entry.row).unwrap_or(mean);
                    (1.0 - (candidate - mean).abs() / 100.0).clamp(0.0, 1.0)
                }
                None => 0.0,
            };
            let score = FEATURE_WEIGHT * feature + GENRE_WEIGHT * genre + POPULARITY_WEIGHT * popularity;
            BlendedCandidate {
                row: entry.row,
                score,
                components: BlendComponents {
                    feature,
                    genre,
                    popularity,
                },
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| matrix.uri(a.row).cmp(matrix.uri(b.row)))
    });
    candidates.truncate(limit);
    candidates
}
