//! Hybrid ranking math: content, collaborative-proxy, and text/recency
//! components blended with configurable weights, plus bounded
//! epsilon-greedy exploration.
//!
//! This is the same computation the external ranking service performs; the
//! server exposes it on its own `/api/ranking/hybrid` route so one
//! deployment can act as the delegate for another. The exploration swap is
//! a pure function of the ordered candidate URIs and the exploration rate,
//! never of wall-clock time, so identical requests perturb identically.

use crate::catalog::{Catalog, FEATURE_DIMENSIONS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Component weights for the hybrid blend. Service-wide defaults,
/// overridable per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    /// Content (audio feature cosine) weight.
    pub alpha: f64,
    /// Collaborative-proxy (popularity) weight.
    pub beta: f64,
    /// Text/recency-proxy (release year) weight.
    pub gamma: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        HybridWeights {
            alpha: 0.5,
            beta: 0.3,
            gamma: 0.2,
        }
    }
}

/// A seed track with its request-scoped weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedWeight {
    pub track_uri: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridComponents {
    pub content: f64,
    pub collaborative: f64,
    pub text: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub track_uri: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<HybridComponents>,
}

/// Rank candidates against weighted seeds.
///
/// Candidate URIs are deduplicated keeping first-occurrence order; URIs
/// unknown to the catalog are skipped. Seeds that do not resolve are
/// dropped; if none resolve the result is empty.
pub fn rank(
    catalog: &Catalog,
    seeds: &[SeedWeight],
    candidate_uris: &[String],
    weights: HybridWeights,
    exploration: f64,
) -> Vec<RankedCandidate> {
    if seeds.is_empty() || candidate_uris.is_empty() {
        return Vec::new();
    }

    let candidates = dedupe_preserving_order(candidate_uris);

    let mut resolved: Vec<(&str, f64)> = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if catalog.by_uri(&seed.track_uri).is_none() {
            continue;
        }
        let weight = if seed.weight > 0.0 { seed.weight } else { 1.0 };
        resolved.push((seed.track_uri.as_str(), weight));
    }
    if resolved.is_empty() {
        return Vec::new();
    }

    let weight_sum: f64 = resolved.iter().map(|(_, weight)| weight).sum();
    let seed_weights: Vec<f64> = if weight_sum <= 0.0 {
        vec![1.0 / resolved.len() as f64; resolved.len()]
    } else {
        resolved
            .iter()
            .map(|(_, weight)| weight / weight_sum)
            .collect()
    };

    let seed_tracks: Vec<&crate::catalog::Track> = resolved
        .iter()
        .map(|(uri, _)| catalog.by_uri(uri).expect("seed resolved above"))
        .collect();

    let centroid = weighted_centroid(&seed_tracks, &seed_weights);
    let seed_years: Vec<i32> = seed_tracks
        .iter()
        .filter_map(|track| track.release_year)
        .collect();

    let denominator = (weights.alpha + weights.beta + weights.gamma).max(1e-6);

    let mut results: Vec<RankedCandidate> = Vec::with_capacity(candidates.len());
    for uri in &candidates {
        let track = match catalog.by_uri(uri) {
            Some(track) => track,
            None => continue,
        };
        let content = content_similarity(&track.feature_vector(), &centroid);
        let collaborative = collaborative_component(track.popularity);
        let text = text_component(track.release_year, &seed_years);
        let score =
            (weights.alpha * content + weights.beta * collaborative + weights.gamma * text)
                / denominator;
        results.push(RankedCandidate {
            track_uri: uri.clone(),
            score,
            components: Some(HybridComponents {
                content,
                collaborative,
                text,
            }),
        });
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    apply_exploration(&mut results, exploration);
    results
}

fn dedupe_preserving_order(uris: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    uris.iter()
        .filter(|uri| seen.insert(uri.as_str()))
        .cloned()
        .collect()
}

fn weighted_centroid(
    tracks: &[&crate::catalog::Track],
    weights: &[f64],
) -> [f64; FEATURE_DIMENSIONS] {
    let mut centroid = [0.0; FEATURE_DIMENSIONS];
    for (track, &weight) in tracks.iter().zip(weights.iter()) {
        let vector = track.feature_vector();
        for column in 0..FEATURE_DIMENSIONS {
            centroid[column] += vector[column] * weight;
        }
    }
    centroid
}

/// Cosine similarity of the raw candidate vector against the weighted seed
/// centroid, rescaled from [-1,1] to [0,1] and clamped to [0.05, 0.95] so
/// the blend never produces degenerate exact-0/exact-1 ranking ties. A zero
/// centroid carries no information and scores a neutral 0.5.
pub fn content_similarity(
    vector: &[f64; FEATURE_DIMENSIONS],
    centroid: &[f64; FEATURE_DIMENSIONS],
) -> f64 {
    if centroid.iter().all(|value| value.abs() <= 1e-8) {
        return 0.5;
    }

    let vector_norm = norm(vector);
    let centroid_norm = norm(centroid);
    let mut dot = 0.0;
    for column in 0..FEATURE_DIMENSIONS {
        let a = if vector_norm > 0.0 {
            vector[column] / vector_norm
        } else {
            vector[column]
        };
        let b = if centroid_norm > 0.0 {
            centroid[column] / centroid_norm
        } else {
            centroid[column]
        };
        dot += a * b;
    }
    let similarity = (dot.clamp(-1.0, 1.0) + 1.0) / 2.0;
    similarity.clamp(0.05, 0.95)
}

fn norm(vector: &[f64; FEATURE_DIMENSIONS]) -> f64 {
    vector.iter().map(|value| value * value).sum::<f64>().sqrt()
}

/// Popularity scaled to [0,1]. A stand-in for a true collaborative
/// filtering signal; missing popularity contributes nothing.
pub fn collaborative_component(popularity: Option<f64>) -> f64 {
    (popularity.unwrap_or(0.0) / 100.0).clamp(0.0, 1.0)
}

/// Linear decay over a 50-year window against the nearest seed year.
/// Neutral 0.5 when either side has no known year.
pub fn text_component(candidate_year: Option<i32>, seed_years: &[i32]) -> f64 {
    let candidate = match candidate_year {
        Some(year) => year,
        None => return 0.5,
    };
    let best = seed_years
        .iter()
        .map(|seed| (candidate - seed).abs())
        .min();
    match best {
        Some(diff) => (1.0 - diff.min(50) as f64 / 50.0).clamp(0.0, 1.0),
        None => 0.5,
    }
}

/// Deterministic exploration seed: SHA-256 over the ordered candidate URI
/// sequence (NUL-separated), first 8 bytes little-endian.
pub fn exploration_seed(results: &[RankedCandidate]) -> u64 {
    let mut hasher = Sha256::new();
    for candidate in results {
        hasher.update(candidate.track_uri.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Bounded epsilon-greedy perturbation: swap position 0 with one position
/// drawn uniformly from [1, span], span = clamp(round(rate * n), 1, n-1).
pub fn apply_exploration(results: &mut [RankedCandidate], rate: f64) {
    if rate <= 0.0 || results.len() < 2 {
        return;
    }
    let span = ((rate * results.len() as f64).round() as usize)
        .max(1)
        .min(results.len() - 1);
    let mut rng = StdRng::seed_from_u64(exploration_seed(results));
    let swap_index = rng.random_range(1..=span);
    results.swap(0, swap_index);
}
