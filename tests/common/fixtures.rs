//! Test fixture creation for the catalog database.
//!
//! Builds a small SQLite dataset with the original CSV column names, the
//! same shape the import tooling produces.

use rusqlite::{params, Connection};
use std::path::Path;

pub struct FixtureTrack {
    pub uri: &'static str,
    pub name: &'static str,
    pub album: &'static str,
    pub artists: &'static str,
    pub release_date: &'static str,
    pub popularity: Option<f64>,
    pub genres: &'static str,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
}

/// Fixed roster used by most e2e tests: two close synthpop tracks, a folk
/// pair from the seventies, and two stragglers with sparse metadata.
pub const FIXTURE_TRACKS: [FixtureTrack; 6] = [
    FixtureTrack {
        uri: "spotify:track:alpha",
        name: "Neon Skyline",
        album: "City Glow",
        artists: "The Marquee Lights",
        release_date: "2019-04-12",
        popularity: Some(78.0),
        genres: "indie rock, synthpop",
        danceability: 0.62,
        energy: 0.71,
        valence: 0.55,
        tempo: 122.0,
    },
    FixtureTrack {
        uri: "spotify:track:beta",
        name: "Neon Nights",
        album: "After Hours",
        artists: "Velvet Circuit",
        release_date: "2020-09-01",
        popularity: Some(74.0),
        genres: "synthpop",
        danceability: 0.64,
        energy: 0.69,
        valence: 0.58,
        tempo: 120.0,
    },
    FixtureTrack {
        uri: "spotify:track:gamma",
        name: "Dust Roads",
        album: "Backcountry",
        artists: "Hollow Pines",
        release_date: "1972-03-20",
        popularity: Some(35.0),
        genres: "folk",
        danceability: 0.31,
        energy: 0.22,
        valence: 0.4,
        tempo: 84.0,
    },
    FixtureTrack {
        uri: "spotify:track:delta",
        name: "Dust and Embers",
        album: "Backcountry",
        artists: "Hollow Pines",
        release_date: "1975-11-05",
        popularity: Some(40.0),
        genres: "folk, folk rock",
        danceability: 0.34,
        energy: 0.25,
        valence: 0.38,
        tempo: 88.0,
    },
    FixtureTrack {
        uri: "spotify:track:epsilon",
        name: "Static Bloom",
        album: "Fadeout",
        artists: "Gauze Season",
        release_date: "1991-06-14",
        popularity: Some(55.0),
        genres: "shoegaze",
        danceability: 0.45,
        energy: 0.8,
        valence: 0.3,
        tempo: 132.0,
    },
    FixtureTrack {
        uri: "spotify:track:zeta",
        name: "Glass Harbor",
        album: "Stillness",
        artists: "Mara Lowell",
        release_date: "2005",
        popularity: None,
        genres: "",
        danceability: 0.2,
        energy: 0.15,
        valence: 0.6,
        tempo: 70.0,
    },
];

pub fn create_test_catalog_db(path: &Path) {
    let conn = Connection::open(path).expect("open test catalog db");
    conn.execute_batch(
        "CREATE TABLE tracks (
            \"Track URI\" TEXT PRIMARY KEY,
            \"Track Name\" TEXT,
            \"Album Name\" TEXT,
            \"Artist Name(s)\" TEXT,
            \"Release Date\" TEXT,
            \"Duration (ms)\" REAL,
            \"Popularity\" REAL,
            \"Explicit\" TEXT,
            \"Genres\" TEXT,
            \"Danceability\" REAL,
            \"Energy\" REAL,
            \"Valence\" REAL,
            \"Tempo\" REAL,
            \"Liveness\" REAL,
            \"Acousticness\" REAL,
            \"Speechiness\" REAL,
            \"Instrumentalness\" REAL,
            \"Loudness\" REAL,
            \"Time Signature\" INTEGER,
            \"Key\" INTEGER,
            \"Mode\" INTEGER
        );",
    )
    .expect("create tracks table");

    for track in FIXTURE_TRACKS.iter() {
        conn.execute(
            "INSERT INTO tracks (
                \"Track URI\", \"Track Name\", \"Album Name\", \"Artist Name(s)\",
                \"Release Date\", \"Duration (ms)\", \"Popularity\", \"Explicit\",
                \"Genres\", \"Danceability\", \"Energy\", \"Valence\", \"Tempo\",
                \"Liveness\", \"Acousticness\", \"Speechiness\", \"Instrumentalness\",
                \"Loudness\", \"Time Signature\", \"Key\", \"Mode\"
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                track.uri,
                track.name,
                track.album,
                track.artists,
                track.release_date,
                210_000.0,
                track.popularity,
                "False",
                track.genres,
                track.danceability,
                track.energy,
                track.valence,
                track.tempo,
                0.12,
                0.3,
                0.04,
                0.001,
                -8.5,
                4,
                5,
                1,
            ],
        )
        .expect("insert fixture track");
    }
}
