//! Library sync with a per-account cooldown guard.
//!
//! A sync pulls the user's top tracks across the three platform time
//! ranges plus their saved tracks, converts rank positions into listening
//! weights, and replaces the stored library wholesale. Re-syncs within the
//! cooldown window are skipped to bound outbound call volume.

use super::{PlatformTrack, SpotifyClient, SpotifyError};
use crate::catalog::Catalog;
use crate::user::UserStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// (time range, base weight) ladder for top tracks.
const TIME_RANGE_WEIGHTS: [(&str, f64); 3] = [
    ("short_term", 1.0),
    ("medium_term", 0.85),
    ("long_term", 0.7),
];

const TOP_TRACKS_PER_RANGE: usize = 50;

/// Weight for a top track at rank `index` within its time range.
fn top_track_weight(base: f64, index: usize) -> f64 {
    base - index as f64 * 0.01
}

/// Weight for a saved track at position `index`; floors at 0.05 so a deep
/// library still contributes signal.
fn saved_track_weight(index: usize) -> f64 {
    (0.4 - index as f64 * 0.001).max(0.05)
}

pub struct LibrarySyncer {
    client: Arc<SpotifyClient>,
    store: Arc<dyn UserStore>,
    cooldown: Duration,
    saved_tracks_limit: usize,
    last_sync: Mutex<HashMap<String, Instant>>,
}

impl LibrarySyncer {
    pub fn new(
        client: Arc<SpotifyClient>,
        store: Arc<dyn UserStore>,
        cooldown: Duration,
        saved_tracks_limit: usize,
    ) -> LibrarySyncer {
        LibrarySyncer {
            client,
            store,
            cooldown,
            saved_tracks_limit,
            last_sync: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the cooldown window still covers the user's last sync.
    pub fn cooldown_active(&self, user_id: &str) -> bool {
        let last_sync = self.last_sync.lock().unwrap();
        match last_sync.get(user_id) {
            Some(completed) => completed.elapsed() < self.cooldown,
            None => false,
        }
    }

    fn mark_synced(&self, user_id: &str) {
        self.last_sync
            .lock()
            .unwrap()
            .insert(user_id.to_string(), Instant::now());
    }

    /// Sync the user's library. Returns false when skipped by the cooldown
    /// guard. The cooldown timestamp is only recorded after a completed
    /// sync, so a failed attempt can be retried immediately.
    pub async fn sync_user_library(&self, user_id: &str) -> Result<bool, SpotifyError> {
        if self.cooldown_active(user_id) {
            debug!("Skipping library sync for {user_id}: cooldown active");
            return Ok(false);
        }

        let mut weights: HashMap<String, f64> = HashMap::new();

        for (time_range, base_weight) in TIME_RANGE_WEIGHTS {
            let tracks = self
                .client
                .top_tracks_for_user(
                    self.store.as_ref(),
                    user_id,
                    time_range,
                    TOP_TRACKS_PER_RANGE,
                )
                .await?;
            merge_weights(&mut weights, &tracks, |index| {
                top_track_weight(base_weight, index)
            });
        }

        let access_token = self
            .client
            .ensure_access_token(self.store.as_ref(), user_id)
            .await?;
        let saved = self
            .client
            .saved_tracks(&access_token, self.saved_tracks_limit)
            .await?;
        merge_weights(&mut weights, &saved, saved_track_weight);

        let rows: Vec<(String, f64)> = weights.into_iter().collect();
        self.store.replace_user_tracks(user_id, &rows)?;
        self.mark_synced(user_id);
        debug!("Synced {} library tracks for {user_id}", rows.len());
        Ok(true)
    }

    /// Resolve recommendation seeds for a linked user: best-effort sync,
    /// then the heaviest library tracks that exist in the catalog, with a
    /// direct top-tracks fetch as the last resort.
    pub async fn seed_uris_for_user(
        &self,
        catalog: &Catalog,
        user_id: &str,
        limit: usize,
    ) -> Vec<String> {
        if let Err(error) = self.sync_user_library(user_id).await {
            warn!("Library sync failed for {user_id}: {error}");
        }

        match self.store.user_tracks(user_id, (limit * 5).max(50)) {
            Ok(rows) => {
                let known: Vec<String> = rows
                    .into_iter()
                    .map(|(uri, _)| uri)
                    .filter(|uri| catalog.by_uri(uri).is_some())
                    .take(limit)
                    .collect();
                if !known.is_empty() {
                    return known;
                }
            }
            Err(error) => warn!("Failed to read library for {user_id}: {error}"),
        }

        // Fallback: query the platform directly and keep catalog members.
        let mut seeds = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (time_range, _) in TIME_RANGE_WEIGHTS {
            let batch = match self
                .client
                .top_tracks_for_user(
                    self.store.as_ref(),
                    user_id,
                    time_range,
                    (limit * 5).min(50),
                )
                .await
            {
                Ok(batch) => batch,
                Err(error) => {
                    warn!("Top tracks fetch failed for {user_id}: {error}");
                    return seeds;
                }
            };
            for track in batch {
                if !seen.insert(track.uri.clone()) {
                    continue;
                }
                if catalog.by_uri(&track.uri).is_some() {
                    seeds.push(track.uri);
                    if seeds.len() >= limit {
                        return seeds;
                    }
                }
            }
        }
        seeds
    }
}

fn merge_weights<F>(weights: &mut HashMap<String, f64>, tracks: &[PlatformTrack], weight_for: F)
where
    F: Fn(usize) -> f64,
{
    for (index, track) in tracks.iter().enumerate() {
        let weight = weight_for(index);
        if weight <= 0.0 {
            continue;
        }
        let entry = weights.entry(track.uri.clone()).or_insert(0.0);
        if weight > *entry {
            *entry = weight;
        }
    }
}
