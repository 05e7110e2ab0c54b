//! External music platform integration.
//!
//! The server never runs the OAuth authorization flow itself; token rows
//! arrive in the user store out of band. What lives here is the read side:
//! bounded-timeout API calls, a single refresh-and-retry on an expired
//! access token, and the cooldown-guarded library sync that feeds seed
//! resolution and per-user analytics.

mod client;
mod sync;

pub use client::SpotifyClient;
pub use sync::LibrarySyncer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("platform account not linked")]
    NotLinked,
    #[error("platform credentials are not configured")]
    CredentialsMissing,
    #[error("platform refresh token missing")]
    RefreshTokenMissing,
    #[error("failed to refresh platform access token")]
    TokenRefreshFailed,
    #[error("platform API request failed with status {0}")]
    Api(reqwest::StatusCode),
    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A track as reported by the platform API.
#[derive(Debug, Clone)]
pub struct PlatformTrack {
    pub uri: String,
    pub name: String,
    pub artists: String,
}
