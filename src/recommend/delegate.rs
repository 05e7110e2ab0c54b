//! HTTP client for an external ranking delegate.
//!
//! The delegate speaks the same protocol as this server's own
//! `/api/ranking/hybrid` route. Responses are validated structurally: a
//! payload without a `results` array counts as a delegate failure, which
//! the caller turns into a local-blend fallback rather than a request
//! error.

use super::hybrid::{HybridComponents, HybridWeights, RankedCandidate, SeedWeight};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("failed to contact ranking service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ranking service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected ranking service response")]
    MalformedResponse,
}

#[derive(Serialize)]
struct RankingRequest<'a> {
    seeds: &'a [SeedWeight],
    candidate_uris: &'a [String],
    exploration: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
}

pub struct RankingDelegate {
    client: Client,
    base_url: String,
}

impl RankingDelegate {
    /// Build a delegate client with a bounded per-request timeout. One
    /// request per ranking call; retries are the caller's fallback chain,
    /// not this client's concern.
    pub fn new(base_url: &str, timeout: Duration) -> Result<RankingDelegate> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(3))
            .build()
            .context("Failed to build ranking delegate HTTP client")?;
        Ok(RankingDelegate {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn rank(
        &self,
        seeds: &[SeedWeight],
        candidate_uris: &[String],
        weights: HybridWeights,
        exploration: f64,
    ) -> std::result::Result<Vec<RankedCandidate>, DelegateError> {
        let request = RankingRequest {
            seeds,
            candidate_uris,
            exploration,
            alpha: weights.alpha,
            beta: weights.beta,
            gamma: weights.gamma,
        };

        let response = self
            .client
            .post(format!("{}/api/ranking/hybrid", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DelegateError::Status(response.status()));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|_| DelegateError::MalformedResponse)?;
        parse_ranking_response(&payload)
    }
}

/// Validate and extract the `results` collection from a delegate payload.
/// Entries without a string `track_uri` are skipped; a missing or
/// non-array `results` fails the whole response.
pub fn parse_ranking_response(
    payload: &serde_json::Value,
) -> std::result::Result<Vec<RankedCandidate>, DelegateError> {
    let results = payload
        .get("results")
        .and_then(|value| value.as_array())
        .ok_or(DelegateError::MalformedResponse)?;

    let mut ranked = Vec::with_capacity(results.len());
    for item in results {
        let track_uri = match item.get("track_uri").and_then(|value| value.as_str()) {
            Some(uri) => uri.to_string(),
            None => continue,
        };
        let score = item
            .get("score")
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0);
        let components = item.get("components").and_then(|value| {
            let object = value.as_object()?;
            let get = |key: &str| object.get(key).and_then(|v| v.as_f64());
            Some(HybridComponents {
                content: get("content")?,
                collaborative: get("collaborative")?,
                text: get("text")?,
            })
        });
        ranked.push(RankedCandidate {
            track_uri,
            score,
            components,
        });
    }
    Ok(ranked)
}
