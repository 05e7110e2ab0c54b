//! Recommendation core.
//!
//! Two scorer variants sit behind one entry point: the local multi-signal
//! blend, and an external hybrid ranking delegate. The delegate is used
//! when configured; any delegate failure (timeout, bad status, malformed
//! payload, empty result) falls back to the local blend over the same
//! candidate pool, so a ranking request never fails because the delegate
//! did.

mod blend;
mod delegate;
mod hybrid;
mod shortlist;

pub use blend::{
    blend, jaccard_similarity, BlendComponents, BlendedCandidate, FEATURE_WEIGHT, GENRE_WEIGHT,
    POPULARITY_WEIGHT,
};
pub use delegate::{parse_ranking_response, DelegateError, RankingDelegate};
pub use hybrid::{
    apply_exploration, collaborative_component, content_similarity, exploration_seed, rank,
    text_component, HybridComponents, HybridWeights, RankedCandidate, SeedWeight,
};
pub use shortlist::{
    candidate_pool_size, normalize_seed_weights, shortlist, weighted_centroid, ShortlistEntry,
};

use crate::features::FeatureCache;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Component breakdown attached to a recommendation, shaped by whichever
/// scorer produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScoreComponents {
    Local(BlendComponents),
    Hybrid(HybridComponents),
}

/// One ranked recommendation, referencing the catalog by row index.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub row: usize,
    pub score: f64,
    pub components: Option<ScoreComponents>,
}

pub struct Recommender {
    features: Arc<FeatureCache>,
    delegate: Option<RankingDelegate>,
    seed_limit: usize,
    exploration: f64,
    weights: HybridWeights,
}

impl Recommender {
    pub fn new(
        features: Arc<FeatureCache>,
        delegate: Option<RankingDelegate>,
        seed_limit: usize,
        exploration: f64,
        weights: HybridWeights,
    ) -> Recommender {
        Recommender {
            features,
            delegate,
            seed_limit,
            exploration,
            weights,
        }
    }

    /// Rank up to `limit` tracks similar to the given seeds.
    ///
    /// Unknown or empty seed URIs degrade to an empty result, never an
    /// error. The delegate's returned order is preserved as-is (it embeds
    /// the exploration swap); only the local path sorts by its own score.
    pub async fn recommend(&self, seed_uris: &[String], limit: usize) -> Vec<Recommendation> {
        if limit == 0 {
            return Vec::new();
        }

        let mut seen = std::collections::HashSet::new();
        let cleaned: Vec<&str> = seed_uris
            .iter()
            .map(|uri| uri.trim())
            .filter(|uri| !uri.is_empty() && seen.insert(*uri))
            .take(self.seed_limit)
            .collect();
        if cleaned.is_empty() {
            return Vec::new();
        }

        let matrix = match self.features.get() {
            Some(matrix) => matrix,
            None => {
                warn!("Feature matrix not built; returning no recommendations");
                return Vec::new();
            }
        };

        let seed_rows: Vec<usize> = cleaned
            .iter()
            .filter_map(|uri| matrix.row_index(uri))
            .collect();
        if seed_rows.is_empty() {
            return Vec::new();
        }

        let pool = shortlist(&matrix, &seed_rows, None, limit);
        if pool.is_empty() {
            return Vec::new();
        }

        if let Some(delegate) = &self.delegate {
            let seeds: Vec<SeedWeight> = seed_rows
                .iter()
                .map(|&row| {
                    let popularity = matrix.popularity(row).unwrap_or(50.0);
                    SeedWeight {
                        track_uri: matrix.uri(row).to_string(),
                        weight: (popularity / 100.0).max(0.01),
                    }
                })
                .collect();
            let candidate_uris: Vec<String> = pool
                .iter()
                .map(|entry| matrix.uri(entry.row).to_string())
                .collect();

            match delegate
                .rank(&seeds, &candidate_uris, self.weights, self.exploration)
                .await
            {
                Ok(ranked) if !ranked.is_empty() => {
                    let recommendations: Vec<Recommendation> = ranked
                        .into_iter()
                        .filter_map(|candidate| {
                            let row = matrix.row_index(&candidate.track_uri)?;
                            Some(Recommendation {
                                row,
                                score: candidate.score,
                                components: candidate.components.map(ScoreComponents::Hybrid),
                            })
                        })
                        .take(limit)
                        .collect();
                    if !recommendations.is_empty() {
                        return recommendations;
                    }
                    debug!("Delegate ranking resolved no known tracks; using local blend");
                }
                Ok(_) => {
                    debug!("Delegate ranking returned no results; using local blend");
                }
                Err(error) => {
                    warn!("Ranking delegate failed ({error}); using local blend");
                }
            }
        }

        blend(&matrix, &seed_rows, &pool, limit)
            .into_iter()
            .map(|candidate| Recommendation {
                row: candidate.row,
                score: candidate.score,
                components: Some(ScoreComponents::Local(candidate.components)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{normalize_row, Catalog, Track};
    use crate::catalog_store::RawTrack;
    use std::time::Duration;

    fn track(uri: &str, danceability: f64) -> Track {
        let mut track = normalize_row(RawTrack::empty(uri));
        track.danceability = Some(danceability);
        track
    }

    fn recommender(tracks: Vec<Track>, delegate: Option<RankingDelegate>) -> Recommender {
        let catalog = Catalog::from_tracks(tracks);
        let features = Arc::new(FeatureCache::new());
        features.build(&catalog);
        Recommender::new(features, delegate, 3, 0.05, HybridWeights::default())
    }

    #[tokio::test]
    async fn test_local_path_ranks_candidates() {
        let recommender = recommender(
            vec![
                track("uri:seed", 0.5),
                track("uri:near", 0.51),
                track("uri:far", 0.9),
            ],
            None,
        );
        let results = recommender.recommend(&["uri:seed".to_string()], 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].row, 1);
        assert!(results[0].score >= results[1].score);
        assert!(matches!(
            results[0].components,
            Some(ScoreComponents::Local(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_seeds_return_empty() {
        let recommender = recommender(vec![track("uri:1", 0.5), track("uri:2", 0.6)], None);
        let results = recommender.recommend(&["uri:ghost".to_string()], 5).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_seeds_covering_catalog_return_empty() {
        let recommender = recommender(vec![track("uri:1", 0.5), track("uri:2", 0.6)], None);
        let results = recommender
            .recommend(&["uri:1".to_string(), "uri:2".to_string()], 5)
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_delegate_falls_back_to_local_blend() {
        // Nothing listens on port 9; the connection error must resolve into
        // the local blend, not an empty result.
        let delegate = RankingDelegate::new("http://127.0.0.1:9", Duration::from_millis(200))
            .expect("client builds");
        let recommender = recommender(
            vec![
                track("uri:seed", 0.5),
                track("uri:near", 0.51),
                track("uri:far", 0.9),
            ],
            Some(delegate),
        );
        let results = recommender.recommend(&["uri:seed".to_string()], 2).await;
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0].components,
            Some(ScoreComponents::Local(_))
        ));
    }
}
