use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of audio feature dimensions used for similarity ranking.
pub const FEATURE_DIMENSIONS: usize = 11;

/// Canonical feature order. Every feature vector in the system (raw or
/// normalized) uses this ordering; changing it invalidates cached matrices.
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSIONS] = [
    "danceability",
    "energy",
    "valence",
    "tempo",
    "liveness",
    "acousticness",
    "speechiness",
    "instrumentalness",
    "loudness",
    "duration_ms",
    "popularity",
];

/// A single catalog track, fully normalized at load time.
///
/// Numeric fields keep their absence explicit (`None`) rather than coercing
/// to zero; the feature-matrix builder is the only place where absence is
/// collapsed to 0.0, and it does so before mean/std computation.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub album: String,
    /// Comma-joined artist names, tokenized on demand via `artist_names()`.
    pub artists: String,
    pub release_date: String,
    pub release_year: Option<i32>,
    pub duration_ms: Option<f64>,
    /// 0-100 scale, missing for tracks never scored by the platform.
    pub popularity: Option<f64>,
    pub explicit: bool,
    pub genres: Vec<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub liveness: Option<f64>,
    pub acousticness: Option<f64>,
    pub speechiness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub loudness: Option<f64>,
    pub time_signature: Option<i32>,
    pub key: Option<i32>,
    pub mode: Option<i32>,
    /// Lowercased name + artists + album with punctuation collapsed,
    /// derived once at load time for substring search.
    pub search_text: String,
}

impl Track {
    /// Raw feature vector in canonical order. Missing values read as 0.0
    /// here; callers that need to distinguish absence must go through the
    /// individual `Option` fields instead.
    pub fn feature_vector(&self) -> [f64; FEATURE_DIMENSIONS] {
        [
            self.danceability.unwrap_or(0.0),
            self.energy.unwrap_or(0.0),
            self.valence.unwrap_or(0.0),
            self.tempo.unwrap_or(0.0),
            self.liveness.unwrap_or(0.0),
            self.acousticness.unwrap_or(0.0),
            self.speechiness.unwrap_or(0.0),
            self.instrumentalness.unwrap_or(0.0),
            self.loudness.unwrap_or(0.0),
            self.duration_ms.unwrap_or(0.0),
            self.popularity.unwrap_or(0.0),
        ]
    }

    /// Individual artist names, split from the comma-joined string.
    pub fn artist_names(&self) -> impl Iterator<Item = &str> {
        self.artists
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Lowercased genre set used for Jaccard similarity.
    pub fn genre_set(&self) -> HashSet<String> {
        self.genres
            .iter()
            .map(|genre| genre.to_lowercase())
            .collect()
    }
}
