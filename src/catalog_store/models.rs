//! Loosely-typed rows as they come out of the backing store.
//!
//! Every field except the URI is optional: the dataset dumps are assembled
//! from CSV exports and carry plenty of holes. Numeric coercion (integer,
//! real, or numeric-looking text) happens in the store; semantic
//! normalization happens in `catalog::load`.

/// One raw track row from the `tracks` table.
///
/// Text columns stay as raw strings; numeric columns are coerced to `f64`
/// (or dropped) at read time. `explicit` stays textual because the source
/// data stores it as "True"/"False" strings or 0/1 integers depending on
/// which import produced the database.
#[derive(Debug, Clone, Default)]
pub struct RawTrack {
    pub uri: String,
    pub name: Option<String>,
    pub album: Option<String>,
    pub artists: Option<String>,
    pub release_date: Option<String>,
    pub duration_ms: Option<f64>,
    pub popularity: Option<f64>,
    pub explicit: Option<String>,
    pub genres: Option<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub liveness: Option<f64>,
    pub acousticness: Option<f64>,
    pub speechiness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub loudness: Option<f64>,
    pub time_signature: Option<f64>,
    pub key: Option<f64>,
    pub mode: Option<f64>,
}

impl RawTrack {
    /// A row with only the URI set. Mostly useful in tests.
    pub fn empty(uri: &str) -> RawTrack {
        RawTrack {
            uri: uri.to_string(),
            ..RawTrack::default()
        }
    }
}
