//! SQLite-backed catalog store for the track dataset dump.
//!
//! The database is produced by the dataset import tooling and keeps the
//! original CSV header names as column names (`"Track URI"`, `"Artist
//! Name(s)"`, ...). Columns may be missing entirely in older dumps, and a
//! numeric column may hold text in some rows; both cases are absorbed here
//! so the loader only ever sees typed `RawTrack` values.

use super::models::RawTrack;
use super::trait_def::CatalogStore;
use anyhow::{bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Dataset columns in SELECT order. `RawTrack` fields are populated by
/// position, so the two must stay in sync.
const TRACK_COLUMNS: [&str; 21] = [
    "Track URI",
    "Track Name",
    "Album Name",
    "Artist Name(s)",
    "Release Date",
    "Duration (ms)",
    "Popularity",
    "Explicit",
    "Genres",
    "Danceability",
    "Energy",
    "Valence",
    "Tempo",
    "Liveness",
    "Acousticness",
    "Speechiness",
    "Instrumentalness",
    "Loudness",
    "Time Signature",
    "Key",
    "Mode",
];

pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

fn value_to_f64(value: Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(v as f64),
        Value::Real(v) => Some(v),
        Value::Text(v) => v.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Text(v) => Some(v),
        Value::Integer(v) => Some(v.to_string()),
        Value::Real(v) => Some(v.to_string()),
        _ => None,
    }
}

impl SqliteCatalogStore {
    /// Open the dataset database read-only. Fails when the file cannot be
    /// opened or the `tracks` table is missing its URI column; the server
    /// cannot start without a readable catalog.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<SqliteCatalogStore> {
        let conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path.as_ref()))?;

        let store = SqliteCatalogStore {
            conn: Mutex::new(conn),
        };
        let available = store.available_columns()?;
        if !available.contains("Track URI") {
            bail!("Catalog database has no \"Track URI\" column in the tracks table");
        }

        let missing: Vec<&str> = TRACK_COLUMNS
            .iter()
            .copied()
            .filter(|column| !available.contains(*column))
            .collect();
        if !missing.is_empty() {
            warn!("Catalog database is missing columns: {:?}", missing);
        }

        info!("Opened track catalog with {} rows", store.tracks_count());
        Ok(store)
    }

    fn available_columns(&self) -> Result<HashSet<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info('tracks')")
            .context("Failed to inspect the tracks table")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        if columns.is_empty() {
            bail!("Catalog database has no tracks table");
        }
        Ok(columns)
    }

    fn select_clause(&self) -> Result<String> {
        let available = self.available_columns()?;
        let parts: Vec<String> = TRACK_COLUMNS
            .iter()
            .map(|column| {
                if available.contains(*column) {
                    format!("\"{column}\"")
                } else {
                    format!("NULL AS \"{column}\"")
                }
            })
            .collect();
        Ok(format!("SELECT {} FROM tracks", parts.join(", ")))
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn load_raw_tracks(&self) -> Result<Vec<RawTrack>> {
        let query = self.select_clause()?;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| {
            let uri = match value_to_string(row.get::<_, Value>(0)?) {
                Some(uri) if !uri.trim().is_empty() => uri.trim().to_string(),
                _ => return Ok(None),
            };
            Ok(Some(RawTrack {
                uri,
                name: value_to_string(row.get(1)?),
                album: value_to_string(row.get(2)?),
                artists: value_to_string(row.get(3)?),
                release_date: value_to_string(row.get(4)?),
                duration_ms: value_to_f64(row.get(5)?),
                popularity: value_to_f64(row.get(6)?),
                explicit: value_to_string(row.get(7)?),
                genres: value_to_string(row.get(8)?),
                danceability: value_to_f64(row.get(9)?),
                energy: value_to_f64(row.get(10)?),
                valence: value_to_f64(row.get(11)?),
                tempo: value_to_f64(row.get(12)?),
                liveness: value_to_f64(row.get(13)?),
                acousticness: value_to_f64(row.get(14)?),
                speechiness: value_to_f64(row.get(15)?),
                instrumentalness: value_to_f64(row.get(16)?),
                loudness: value_to_f64(row.get(17)?),
                time_signature: value_to_f64(row.get(18)?),
                key: value_to_f64(row.get(19)?),
                mode: value_to_f64(row.get(20)?),
            }))
        })?;

        let mut tracks = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            match row? {
                Some(track) => tracks.push(track),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Skipped {} track rows without a URI", skipped);
        }
        Ok(tracks)
    }

    fn tracks_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|count| count as usize)
        .unwrap_or(0)
    }
}
