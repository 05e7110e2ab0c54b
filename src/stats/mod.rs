//! Dataset analytics.
//!
//! Aggregates counts, averages, leaderboards, and the yearly release
//! histogram over the whole catalog or any subset (a user's synced
//! library). An empty input is a valid zero-result: averages come back as
//! `None` and every leaderboard is empty.

mod insights;

pub use insights::{
    build_discovery_journeys, build_story_insights, DiscoveryJourney, JourneyStep, StoryInsight,
};

use crate::catalog::{Catalog, Track};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

pub const TOP_ARTISTS_LIMIT: usize = 10;
pub const TOP_GENRES_LIMIT: usize = 15;
pub const TOP_TRACKS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReleaseYearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryTotals {
    pub total_rows: usize,
    pub unique_tracks: usize,
    pub unique_artists: usize,
    pub average_popularity: Option<f64>,
    pub average_danceability: Option<f64>,
    pub average_energy: Option<f64>,
    pub release_year_range: ReleaseYearRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopTrack {
    pub track_uri: String,
    pub track_name: String,
    pub artist_names: String,
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetSummary {
    pub totals: SummaryTotals,
    pub top_artists: Vec<NamedCount>,
    pub top_genres: Vec<NamedCount>,
    pub yearly_release_counts: Vec<YearCount>,
    pub top_tracks: Vec<TopTrack>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

fn top_counts(counter: HashMap<String, usize>, limit: usize) -> Vec<NamedCount> {
    let mut entries: Vec<NamedCount> = counter
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(limit);
    entries
}

/// Summarize any iterable of tracks. Works on the full catalog and on
/// per-user subsets alike.
pub fn summarize<'a, I>(tracks: I) -> DatasetSummary
where
    I: IntoIterator<Item = &'a Track>,
{
    let tracks: Vec<&Track> = tracks.into_iter().collect();

    let mut unique_uris = HashSet::new();
    let mut unique_artist_strings = HashSet::new();
    let mut artist_counter: HashMap<String, usize> = HashMap::new();
    let mut genre_counter: HashMap<String, usize> = HashMap::new();
    let mut year_counter: HashMap<i32, usize> = HashMap::new();
    let mut popularity_values = Vec::new();
    let mut danceability_values = Vec::new();
    let mut energy_values = Vec::new();

    for track in &tracks {
        unique_uris.insert(track.uri.as_str());
        if !track.artists.trim().is_empty() {
            unique_artist_strings.insert(track.artists.as_str());
        }
        for artist in track.artist_names() {
            *artist_counter.entry(artist.to_string()).or_insert(0) += 1;
        }
        for genre in &track.genres {
            *genre_counter.entry(genre.clone()).or_insert(0) += 1;
        }
        if let Some(year) = track.release_year {
            *year_counter.entry(year).or_insert(0) += 1;
        }
        if let Some(popularity) = track.popularity {
            popularity_values.push(popularity);
        }
        if let Some(danceability) = track.danceability {
            danceability_values.push(danceability);
        }
        if let Some(energy) = track.energy {
            energy_values.push(energy);
        }
    }

    let release_year_range = ReleaseYearRange {
        min: year_counter.keys().min().copied(),
        max: year_counter.keys().max().copied(),
    };

    let mut yearly_release_counts: Vec<YearCount> = year_counter
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect();
    yearly_release_counts.sort_by_key(|entry| entry.year);

    let mut by_popularity: Vec<&&Track> = tracks.iter().collect();
    by_popularity.sort_by(|a, b| match (a.popularity, b.popularity) {
        (Some(pop_a), Some(pop_b)) => pop_b.total_cmp(&pop_a).then_with(|| a.uri.cmp(&b.uri)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.uri.cmp(&b.uri),
    });
    let top_tracks = by_popularity
        .into_iter()
        .take(TOP_TRACKS_LIMIT)
        .map(|track| TopTrack {
            track_uri: track.uri.clone(),
            track_name: track.name.clone(),
            artist_names: track.artists.clone(),
            popularity: track.popularity,
        })
        .collect();

    DatasetSummary {
        totals: SummaryTotals {
            total_rows: tracks.len(),
            unique_tracks: unique_uris.len(),
            unique_artists: unique_artist_strings.len(),
            average_popularity: average(&popularity_values),
            average_danceability: average(&danceability_values),
            average_energy: average(&energy_values),
            release_year_range,
        },
        top_artists: top_counts(artist_counter, TOP_ARTISTS_LIMIT),
        top_genres: top_counts(genre_counter, TOP_GENRES_LIMIT),
        yearly_release_counts,
        top_tracks,
    }
}

/// Summary of a user's synced library: weighted (uri, weight) rows resolved
/// against the catalog. Top tracks order by sync weight first, popularity
/// second, so the user's heaviest-rotation tracks lead even when the
/// platform scores them low.
pub fn summarize_user_library(catalog: &Catalog, weighted_uris: &[(String, f64)]) -> DatasetSummary {
    let resolved: Vec<(&Track, f64)> = weighted_uris
        .iter()
        .filter_map(|(uri, weight)| catalog.by_uri(uri).map(|track| (track, *weight)))
        .collect();

    let mut summary = summarize(resolved.iter().map(|(track, _)| *track));

    let mut by_weight = resolved;
    by_weight.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| {
                b.0.popularity
                    .unwrap_or(0.0)
                    .total_cmp(&a.0.popularity.unwrap_or(0.0))
            })
            .then_with(|| a.0.uri.cmp(&b.0.uri))
    });
    summary.top_tracks = by_weight
        .into_iter()
        .take(TOP_TRACKS_LIMIT)
        .map(|(track, _)| TopTrack {
            track_uri: track.uri.clone(),
            track_name: track.name.clone(),
            artist_names: track.artists.clone(),
            popularity: track.popularity,
        })
        .collect();
    summary
}

/// Process-wide cache for the catalog summary: computed once per catalog
/// load, swapped whole on rebuild.
#[derive(Default)]
pub struct SummaryCache {
    inner: RwLock<Option<Arc<DatasetSummary>>>,
}

impl SummaryCache {
    pub fn new() -> SummaryCache {
        SummaryCache {
            inner: RwLock::new(None),
        }
    }

    pub fn build(&self, catalog: &Catalog) -> Arc<DatasetSummary> {
        let summary = Arc::new(summarize(catalog.iter()));
        *self.inner.write().unwrap() = Some(Arc::clone(&summary));
        summary
    }

    pub fn get(&self) -> Option<Arc<DatasetSummary>> {
        self.inner.read().unwrap().clone()
    }
}
