//! Catalog-wide feature matrix.
//!
//! Each track contributes one row of eleven audio features (canonical order
//! in [`crate::catalog::FEATURE_NAMES`]); each column is z-score normalized
//! against the whole catalog. Missing values are written as 0.0 *before*
//! the column mean and standard deviation are computed, so after centering
//! they sit at `-mean/std` rather than at zero. This reproduces the
//! dataset tooling's behavior and must not be "fixed" into mean imputation.
//!
//! Row `i` of the matrix always corresponds to catalog index `i`. The
//! shortlister and blender rely on that alignment for all lookups.

use crate::catalog::{Catalog, FEATURE_DIMENSIONS};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct FeatureMatrix {
    rows: Vec<[f64; FEATURE_DIMENSIONS]>,
    means: [f64; FEATURE_DIMENSIONS],
    stds: [f64; FEATURE_DIMENSIONS],
    uris: Vec<String>,
    uri_to_row: HashMap<String, usize>,
    genre_sets: Vec<HashSet<String>>,
    popularity: Vec<Option<f64>>,
    release_years: Vec<Option<i32>>,
}

impl FeatureMatrix {
    /// Build the normalized matrix plus the parallel per-track arrays
    /// (genre sets, popularity, release year) used by the blenders.
    pub fn build(catalog: &Catalog) -> FeatureMatrix {
        let count = catalog.len();
        let mut rows: Vec<[f64; FEATURE_DIMENSIONS]> = Vec::with_capacity(count);
        let mut uris = Vec::with_capacity(count);
        let mut uri_to_row = HashMap::with_capacity(count);
        let mut genre_sets = Vec::with_capacity(count);
        let mut popularity = Vec::with_capacity(count);
        let mut release_years = Vec::with_capacity(count);

        for (index, track) in catalog.iter().enumerate() {
            rows.push(track.feature_vector());
            uri_to_row.insert(track.uri.clone(), index);
            uris.push(track.uri.clone());
            genre_sets.push(track.genre_set());
            popularity.push(track.popularity);
            release_years.push(track.release_year);
        }

        let mut means = [0.0; FEATURE_DIMENSIONS];
        let mut stds = [1.0; FEATURE_DIMENSIONS];
        if count > 0 {
            for column in 0..FEATURE_DIMENSIONS {
                let sum: f64 = rows.iter().map(|row| row[column]).sum();
                means[column] = sum / count as f64;
            }
            for column in 0..FEATURE_DIMENSIONS {
                let variance: f64 = rows
                    .iter()
                    .map(|row| {
                        let delta = row[column] - means[column];
                        delta * delta
                    })
                    .sum::<f64>()
                    / count as f64;
                let std = variance.sqrt();
                // Zero-variance columns divide by 1.0 so every entry lands
                // on exactly 0 instead of NaN.
                stds[column] = if std == 0.0 { 1.0 } else { std };
            }

            rows.par_iter_mut().for_each(|row| {
                for column in 0..FEATURE_DIMENSIONS {
                    row[column] = (row[column] - means[column]) / stds[column];
                }
            });
        }

        info!(
            "Built feature matrix: {} rows x {} columns",
            count, FEATURE_DIMENSIONS
        );

        FeatureMatrix {
            rows,
            means,
            stds,
            uris,
            uri_to_row,
            genre_sets,
            popularity,
            release_years,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Normalized feature row for catalog index `row`.
    pub fn row(&self, row: usize) -> &[f64; FEATURE_DIMENSIONS] {
        &self.rows[row]
    }

    pub fn uri(&self, row: usize) -> &str {
        &self.uris[row]
    }

    pub fn row_index(&self, uri: &str) -> Option<usize> {
        self.uri_to_row.get(uri).copied()
    }

    pub fn genre_set(&self, row: usize) -> &HashSet<String> {
        &self.genre_sets[row]
    }

    pub fn popularity(&self, row: usize) -> Option<f64> {
        self.popularity[row]
    }

    pub fn release_year(&self, row: usize) -> Option<i32> {
        self.release_years[row]
    }

    pub fn means(&self) -> &[f64; FEATURE_DIMENSIONS] {
        &self.means
    }

    pub fn stds(&self) -> &[f64; FEATURE_DIMENSIONS] {
        &self.stds
    }
}

/// Process-wide cache for the feature matrix.
///
/// A rebuild constructs the whole matrix off-lock and swaps the `Arc` in
/// one write; concurrent readers either see the previous complete matrix
/// or the new one, never a partial state. There is no partial
/// invalidation; a catalog reload replaces everything.
#[derive(Default)]
pub struct FeatureCache {
    inner: RwLock<Option<Arc<FeatureMatrix>>>,
}

impl FeatureCache {
    pub fn new() -> FeatureCache {
        FeatureCache {
            inner: RwLock::new(None),
        }
    }

    /// Rebuild from the given catalog and publish the result.
    pub fn build(&self, catalog: &Catalog) -> Arc<FeatureMatrix> {
        let matrix = Arc::new(FeatureMatrix::build(catalog));
        *self.inner.write().unwrap() = Some(Arc::clone(&matrix));
        matrix
    }

    /// The current matrix, if one has been published.
    pub fn get(&self) -> Option<Arc<FeatureMatrix>> {
        self.inner.read().unwrap().clone()
    }
}
