//! Token search over the catalog.
//!
//! Each track carries a normalized `search_text` (lowercased, punctuation
//! collapsed) derived at load time; a query matches when every one of its
//! tokens appears as a substring. Results come back ordered by popularity,
//! missing popularity last.

use crate::catalog::{normalize_search_text, Catalog};
use tracing::info;

/// Queries shorter than this (after trimming) return nothing.
pub const MIN_QUERY_LENGTH: usize = 2;
pub const DEFAULT_SEARCH_LIMIT: usize = 25;
pub const DEFAULT_SUGGEST_LIMIT: usize = 8;

struct SearchEntry {
    row: usize,
    text: String,
}

/// Immutable search index, rebuilt only alongside a catalog reload.
///
/// Entries are pre-sorted by popularity (descending, unknown last, row
/// index as the final tie-break), so a scan can stop as soon as `limit`
/// matches are collected and the result order is already correct.
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

impl SearchIndex {
    pub fn build(catalog: &Catalog) -> SearchIndex {
        let mut order: Vec<(usize, Option<f64>)> = catalog
            .iter()
            .enumerate()
            .map(|(row, track)| (row, track.popularity))
            .collect();
        order.sort_by(|a, b| match (a.1, b.1) {
            (Some(pop_a), Some(pop_b)) => pop_b.total_cmp(&pop_a).then(a.0.cmp(&b.0)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        let entries = order
            .into_iter()
            .map(|(row, _)| SearchEntry {
                row,
                text: catalog
                    .track(row)
                    .map(|track| track.search_text.clone())
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        info!("Built search index over {} tracks", entries.len());
        SearchIndex { entries }
    }

    /// Find up to `limit` catalog rows matching every query token.
    ///
    /// The query goes through the same normalization as the indexed text,
    /// so punctuation differences ("don't" vs "don t") do not break
    /// matching.
    pub fn search(&self, query: &str, limit: usize) -> Vec<usize> {
        let normalized = query.trim().to_lowercase();
        if normalized.chars().count() < MIN_QUERY_LENGTH {
            return Vec::new();
        }
        let normalized = normalize_search_text(&normalized);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for entry in &self.entries {
            if tokens.iter().all(|token| entry.text.contains(token)) {
                matches.push(entry.row);
                if matches.len() >= limit {
                    break;
                }
            }
        }
        matches
    }
}
