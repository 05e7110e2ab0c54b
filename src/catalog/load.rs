//! Raw row normalization.
//!
//! The storage layer hands over loosely-typed rows (everything optional,
//! numerics already coerced or absent). This module turns them into the
//! strongly-typed [`Track`] records the rest of the system runs on: boolean
//! parsing, release-date parsing, genre splitting, and search-text
//! derivation all happen exactly once, here.

use super::track::Track;
use super::Catalog;
use crate::catalog_store::{CatalogStore, RawTrack};
use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

fn search_text_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new("[^a-z0-9]+").expect("invalid search text regex"))
}

/// Lowercase and collapse every non-alphanumeric run to a single space.
pub fn normalize_search_text(value: &str) -> String {
    let lowered = value.to_lowercase();
    search_text_regex()
        .replace_all(&lowered, " ")
        .trim()
        .to_string()
}

/// Parse the platform's boolean encoding: "True"/"False" strings from the
/// CSV lineage, "0"/"1" from databases that stored it as an integer.
/// Anything unrecognized is treated as false.
pub fn parse_bool(raw: Option<&str>) -> bool {
    match raw.map(|value| value.trim().to_lowercase()) {
        Some(value) => matches!(value.as_str(), "true" | "1"),
        None => false,
    }
}

/// Parse a release date into a normalized "YYYY-MM-DD" string plus the
/// derived year. Dates arrive with day, month, or year precision; partial
/// dates snap to the first day of their period. Unparseable input yields
/// an empty date and no year.
pub fn parse_release_date(raw: Option<&str>) -> (String, Option<i32>) {
    let trimmed = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return (String::new(), None),
    };

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return (date.format("%Y-%m-%d").to_string(), Some(year_of(&date)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
        return (date.format("%Y-%m-%d").to_string(), Some(year_of(&date)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{trimmed}-01-01"), "%Y-%m-%d") {
        return (date.format("%Y-%m-%d").to_string(), Some(year_of(&date)));
    }
    (String::new(), None)
}

fn year_of(date: &NaiveDate) -> i32 {
    use chrono::Datelike;
    date.year()
}

/// Split a comma-joined genre string into trimmed, non-empty entries.
/// Surrounding quotes from the CSV lineage are stripped first.
pub fn split_genres(raw: Option<&str>) -> Vec<String> {
    let cleaned = match raw {
        Some(value) => value.trim().trim_matches('"'),
        None => return Vec::new(),
    };
    cleaned
        .split(',')
        .map(str::trim)
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect()
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn as_int(value: Option<f64>) -> Option<i32> {
    finite(value).map(|v| v as i32)
}

/// Normalize one raw storage row into a typed track record.
pub fn normalize_row(raw: RawTrack) -> Track {
    let name = raw.name.unwrap_or_default();
    let album = raw.album.unwrap_or_default();
    let artists = raw.artists.unwrap_or_default();
    let (release_date, release_year) = parse_release_date(raw.release_date.as_deref());
    let genres = split_genres(raw.genres.as_deref());

    let search_text = format!(
        "{} {} {}",
        normalize_search_text(&name),
        normalize_search_text(&artists),
        normalize_search_text(&album),
    )
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ");

    Track {
        uri: raw.uri,
        name,
        album,
        artists,
        release_date,
        release_year,
        duration_ms: finite(raw.duration_ms),
        popularity: finite(raw.popularity),
        explicit: parse_bool(raw.explicit.as_deref()),
        genres,
        danceability: finite(raw.danceability),
        energy: finite(raw.energy),
        valence: finite(raw.valence),
        tempo: finite(raw.tempo),
        liveness: finite(raw.liveness),
        acousticness: finite(raw.acousticness),
        speechiness: finite(raw.speechiness),
        instrumentalness: finite(raw.instrumentalness),
        loudness: finite(raw.loudness),
        time_signature: as_int(raw.time_signature),
        key: as_int(raw.key),
        mode: as_int(raw.mode),
        search_text,
    }
}

/// Load and normalize the full catalog from a storage backend.
///
/// This is the startup path: a storage failure here is fatal to the server,
/// because nothing downstream can operate without the catalog.
pub fn load_catalog(store: &dyn CatalogStore) -> Result<Catalog> {
    let raw_tracks = store.load_raw_tracks()?;
    let total = raw_tracks.len();
    let tracks: Vec<Track> = raw_tracks.into_iter().map(normalize_row).collect();
    let catalog = Catalog::from_tracks(tracks);
    if catalog.len() < total {
        warn!(
            "Dropped {} duplicate track URIs while loading the catalog",
            total - catalog.len()
        );
    }
    info!("Loaded catalog with {} tracks", catalog.len());
    Ok(catalog)
}
