//! HTTP route handlers.
//!
//! Thin glue only: request shapes in, core calls, response shapes out.
//! Ranking-core failure modes (unknown seeds, empty pools, delegate
//! trouble) all surface as empty collections with a 200, per the error
//! model; 400s are reserved for requests that are structurally unusable.

use super::state::ServerState;
use crate::catalog::Track;
use crate::recommend::{rank, HybridWeights, RankedCandidate, Recommendation, SeedWeight};
use crate::search::{DEFAULT_SEARCH_LIMIT, DEFAULT_SUGGEST_LIMIT};
use crate::stats::{
    build_discovery_journeys, build_story_insights, summarize_user_library, DatasetSummary,
    DiscoveryJourney, StoryInsight,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

const MAX_RESULT_LIMIT: usize = 100;
const USER_LIBRARY_FETCH_LIMIT: usize = 100_000;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    pub track_uri: String,
    pub track_name: String,
    pub artist_names: String,
    pub album_name: String,
    pub release_date: String,
    pub release_year: Option<i32>,
    pub popularity: Option<f64>,
    pub genres: Vec<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
}

impl TrackSummary {
    fn from_track(track: &Track) -> TrackSummary {
        TrackSummary {
            track_uri: track.uri.clone(),
            track_name: track.name.clone(),
            artist_names: track.artists.clone(),
            album_name: track.album.clone(),
            release_date: track.release_date.clone(),
            release_year: track.release_year,
            popularity: track.popularity,
            genres: track.genres.clone(),
            danceability: track.danceability,
            energy: track.energy,
            valence: track.valence,
            tempo: track.tempo,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub track_uri: String,
    pub track_name: String,
    pub artist_names: String,
    pub album_name: String,
    pub release_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackDetail {
    #[serde(flatten)]
    pub summary: TrackSummary,
    pub duration_ms: Option<f64>,
    pub explicit: bool,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub time_signature: Option<i32>,
    pub key: Option<i32>,
    pub mode: Option<i32>,
}

impl TrackDetail {
    fn from_track(track: &Track) -> TrackDetail {
        TrackDetail {
            summary: TrackSummary::from_track(track),
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            loudness: track.loudness,
            speechiness: track.speechiness,
            acousticness: track.acousticness,
            instrumentalness: track.instrumentalness,
            liveness: track.liveness,
            time_signature: track.time_signature,
            key: track.key,
            mode: track.mode,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationItem {
    #[serde(flatten)]
    pub summary: TrackSummary,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<crate::recommend::ScoreComponents>,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn health(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "hash": state.hash,
        "tracks": state.catalog.len(),
        "uptime_sec": state.start_time.elapsed().as_secs(),
    }))
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<TrackSummary>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_RESULT_LIMIT);
    let rows = state.search_index.search(&params.q, limit);
    let results = rows
        .into_iter()
        .filter_map(|row| state.catalog.track(row))
        .map(TrackSummary::from_track)
        .collect();
    Json(results)
}

pub async fn suggest(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Suggestion>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SUGGEST_LIMIT)
        .clamp(1, MAX_RESULT_LIMIT);
    let rows = state.search_index.search(&params.q, limit);
    let results = rows
        .into_iter()
        .filter_map(|row| state.catalog.track(row))
        .map(|track| Suggestion {
            track_uri: track.uri.clone(),
            track_name: track.name.clone(),
            artist_names: track.artists.clone(),
            album_name: track.album.clone(),
            release_date: track.release_date.clone(),
        })
        .collect();
    Json(results)
}

pub async fn song_detail(
    State(state): State<ServerState>,
    Path(uri): Path<String>,
) -> Result<Json<TrackDetail>, ApiError> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(bad_request("Missing track URI."));
    }
    match state.catalog.by_uri(uri) {
        Some(track) => Ok(Json(TrackDetail::from_track(track))),
        None => Err(not_found("Track not found.")),
    }
}

#[derive(Deserialize)]
pub struct StatsParams {
    pub user_id: Option<String>,
}

pub async fn stats(
    State(state): State<ServerState>,
    Query(params): Query<StatsParams>,
) -> Json<DatasetSummary> {
    if let Some(user_id) = params.user_id.as_deref() {
        return Json(user_summary(&state, user_id));
    }
    let summary = state
        .summary
        .get()
        .map(|cached| (*cached).clone())
        .unwrap_or_default();
    Json(summary)
}

fn user_summary(state: &ServerState, user_id: &str) -> DatasetSummary {
    let rows = state
        .user_store
        .user_tracks(user_id, USER_LIBRARY_FETCH_LIMIT)
        .unwrap_or_else(|error| {
            warn!("Failed to load library for {user_id}: {error}");
            Vec::new()
        });
    summarize_user_library(&state.catalog, &rows)
}

#[derive(Deserialize)]
pub struct RecommendBody {
    #[serde(default)]
    pub uris: Vec<String>,
    pub limit: Option<usize>,
    pub user_id: Option<String>,
}

pub async fn recommend(
    State(state): State<ServerState>,
    Json(body): Json<RecommendBody>,
) -> Result<Json<Vec<RecommendationItem>>, ApiError> {
    let mut seeds: Vec<String> = body
        .uris
        .iter()
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
        .collect();

    if seeds.is_empty() {
        match (&body.user_id, &state.syncer) {
            (Some(user_id), Some(syncer)) => {
                seeds = syncer
                    .seed_uris_for_user(&state.catalog, user_id, state.ranking.seed_limit)
                    .await;
                if seeds.is_empty() {
                    return Ok(Json(Vec::new()));
                }
            }
            _ => return Err(bad_request("Provide at least one track URI.")),
        }
    }

    let limit = body.limit.unwrap_or(25).clamp(1, MAX_RESULT_LIMIT);
    let recommendations = state.recommender.recommend(&seeds, limit).await;
    Ok(Json(to_recommendation_items(&state, recommendations)))
}

fn to_recommendation_items(
    state: &ServerState,
    recommendations: Vec<Recommendation>,
) -> Vec<RecommendationItem> {
    recommendations
        .into_iter()
        .filter_map(|recommendation| {
            let track = state.catalog.track(recommendation.row)?;
            Some(RecommendationItem {
                summary: TrackSummary::from_track(track),
                similarity: round4(recommendation.score),
                components: recommendation.components,
            })
        })
        .collect()
}

#[derive(Deserialize)]
pub struct HybridRankingBody {
    #[serde(default)]
    pub seeds: Vec<SeedWeight>,
    #[serde(default)]
    pub candidate_uris: Vec<String>,
    pub exploration: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

#[derive(Serialize)]
pub struct HybridRankingResponse {
    pub results: Vec<RankedCandidate>,
}

/// The in-process hybrid scorer, exposed with the delegate wire protocol.
pub async fn ranking_hybrid(
    State(state): State<ServerState>,
    Json(body): Json<HybridRankingBody>,
) -> Json<HybridRankingResponse> {
    let defaults = &state.ranking.weights;
    let weights = HybridWeights {
        alpha: body.alpha.unwrap_or(defaults.alpha).clamp(0.0, 1.0),
        beta: body.beta.unwrap_or(defaults.beta).clamp(0.0, 1.0),
        gamma: body.gamma.unwrap_or(defaults.gamma).clamp(0.0, 1.0),
    };
    let exploration = body
        .exploration
        .unwrap_or(state.ranking.exploration)
        .clamp(0.0, 1.0);

    let results = rank(
        &state.catalog,
        &body.seeds,
        &body.candidate_uris,
        weights,
        exploration,
    );
    Json(HybridRankingResponse { results })
}

#[derive(Deserialize)]
pub struct StoryParams {
    pub user_id: Option<String>,
}

pub async fn story(
    State(state): State<ServerState>,
    Query(params): Query<StoryParams>,
) -> Json<Vec<StoryInsight>> {
    let (summary, scope) = match params.user_id.as_deref() {
        Some(user_id) => (user_summary(&state, user_id), "your library"),
        None => (
            state
                .summary
                .get()
                .map(|cached| (*cached).clone())
                .unwrap_or_default(),
            "the catalog",
        ),
    };
    Json(build_story_insights(&summary, scope))
}

#[derive(Deserialize)]
pub struct JourneysParams {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn journeys(
    State(state): State<ServerState>,
    Query(params): Query<JourneysParams>,
) -> Json<Vec<DiscoveryJourney>> {
    let summary = match params.user_id.as_deref() {
        Some(user_id) => user_summary(&state, user_id),
        None => state
            .summary
            .get()
            .map(|cached| (*cached).clone())
            .unwrap_or_default(),
    };
    let limit = params.limit.unwrap_or(3).clamp(1, 10);
    Json(build_discovery_journeys(&summary, limit))
}
