mod load;
mod track;

pub use load::{
    load_catalog, normalize_row, normalize_search_text, parse_bool, parse_release_date,
    split_genres,
};
pub use track::{Track, FEATURE_DIMENSIONS, FEATURE_NAMES};

use std::collections::HashMap;

/// The in-memory catalog: every track in load order plus a URI index.
///
/// Load order is significant: the feature matrix is built row-for-row
/// against it, so positions must stay stable for the lifetime of a load.
#[derive(Debug, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    uri_index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from normalized tracks. Duplicate URIs keep the
    /// first occurrence; the caller decides whether to report the rest.
    pub fn from_tracks(tracks: Vec<Track>) -> Catalog {
        let mut deduped = Vec::with_capacity(tracks.len());
        let mut uri_index = HashMap::with_capacity(tracks.len());
        for track in tracks {
            if uri_index.contains_key(&track.uri) {
                continue;
            }
            uri_index.insert(track.uri.clone(), deduped.len());
            deduped.push(track);
        }
        Catalog {
            tracks: deduped,
            uri_index,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn by_uri(&self, uri: &str) -> Option<&Track> {
        self.uri_index.get(uri).map(|&index| &self.tracks[index])
    }

    pub fn index_of(&self, uri: &str) -> Option<usize> {
        self.uri_index.get(uri).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
