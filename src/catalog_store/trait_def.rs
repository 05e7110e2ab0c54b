//! CatalogStore trait definition.
//!
//! The trait abstracts the catalog's backing store so the loader can run
//! against the SQLite dataset dump in production and against in-memory
//! fixtures in tests.

use super::models::RawTrack;
use anyhow::Result;

/// Read access to raw track rows.
pub trait CatalogStore: Send + Sync {
    /// Load every raw track row from the backing store, in storage order.
    fn load_raw_tracks(&self) -> Result<Vec<RawTrack>>;

    /// Number of track rows in the store (for startup logging and health).
    fn tracks_count(&self) -> usize;
}

/// In-memory store over a fixed set of rows, for tests and tooling.
pub struct StaticCatalogStore {
    rows: Vec<RawTrack>,
}

impl StaticCatalogStore {
    pub fn new(rows: Vec<RawTrack>) -> StaticCatalogStore {
        StaticCatalogStore { rows }
    }
}

impl CatalogStore for StaticCatalogStore {
    fn load_raw_tracks(&self) -> Result<Vec<RawTrack>> {
        Ok(self.rows.clone())
    }

    fn tracks_count(&self) -> usize {
        self.rows.len()
    }
}
