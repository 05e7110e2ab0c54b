//! Platform API client.
//!
//! All outbound calls carry bounded timeouts. Token refresh happens in two
//! places only: proactively when the stored token is within 90 seconds of
//! expiry, and reactively exactly once when an API call answers 401. There
//! is no general retry loop.

use super::{PlatformTrack, SpotifyError};
use crate::user::{PlatformToken, UserStore};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh ahead of expiry by this margin.
const EXPIRY_MARGIN_SECS: i64 = 90;

pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base: String,
    token_url: String,
}

impl SpotifyClient {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<SpotifyClient, SpotifyError> {
        Self::with_endpoints(client_id, client_secret, DEFAULT_API_BASE, DEFAULT_TOKEN_URL)
    }

    /// Construct against custom endpoints (tests point this at a local
    /// mock server).
    pub fn with_endpoints(
        client_id: Option<String>,
        client_secret: Option<String>,
        api_base: &str,
        token_url: &str,
    ) -> Result<SpotifyClient, SpotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(3))
            .build()?;
        Ok(SpotifyClient {
            http,
            client_id,
            client_secret,
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
        })
    }

    /// Current access token for a linked user, refreshing proactively when
    /// it is about to expire.
    pub async fn ensure_access_token(
        &self,
        store: &dyn UserStore,
        user_id: &str,
    ) -> Result<String, SpotifyError> {
        let token = store
            .get_platform_token(user_id)?
            .ok_or(SpotifyError::NotLinked)?;
        let now = chrono::Utc::now().timestamp();
        if token.expires_at - EXPIRY_MARGIN_SECS > now {
            return Ok(token.access_token);
        }
        if token.refresh_token.is_none() {
            return Ok(token.access_token);
        }
        self.refresh_access_token(store, &token).await
    }

    /// Exchange the refresh token for a new access token and persist it.
    pub async fn refresh_access_token(
        &self,
        store: &dyn UserStore,
        token: &PlatformToken,
    ) -> Result<String, SpotifyError> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(SpotifyError::CredentialsMissing),
        };
        let refresh_token = token
            .refresh_token
            .as_ref()
            .ok_or(SpotifyError::RefreshTokenMissing)?;

        let auth_header = BASE64.encode(format!("{client_id}:{client_secret}"));
        let response = self
            .http
            .post(&self.token_url)
            .header("Authorization", format!("Basic {auth_header}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SpotifyError::TokenRefreshFailed);
        }
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|_| SpotifyError::TokenRefreshFailed)?;

        let access_token = payload
            .get("access_token")
            .and_then(|value| value.as_str())
            .unwrap_or(&token.access_token)
            .to_string();
        let expires_in = payload
            .get("expires_in")
            .and_then(|value| value.as_i64())
            .unwrap_or(3600);
        let new_refresh = payload
            .get("refresh_token")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .or_else(|| token.refresh_token.clone());

        let updated = PlatformToken {
            user_id: token.user_id.clone(),
            access_token: access_token.clone(),
            refresh_token: new_refresh,
            expires_at: chrono::Utc::now().timestamp() + expires_in,
        };
        store.upsert_platform_token(&updated)?;
        debug!("Refreshed platform access token for user {}", token.user_id);
        Ok(access_token)
    }

    /// The user's top tracks for one time range, with the single
    /// 401-refresh-retry the resource model allows.
    pub async fn top_tracks_for_user(
        &self,
        store: &dyn UserStore,
        user_id: &str,
        time_range: &str,
        limit: usize,
    ) -> Result<Vec<PlatformTrack>, SpotifyError> {
        let access_token = self.ensure_access_token(store, user_id).await?;
        let response = self.get_top_tracks(&access_token, time_range, limit).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let token = store
                .get_platform_token(user_id)?
                .ok_or(SpotifyError::NotLinked)?;
            if token.refresh_token.is_none() {
                return Err(SpotifyError::Api(StatusCode::UNAUTHORIZED));
            }
            let refreshed = self.refresh_access_token(store, &token).await?;
            self.get_top_tracks(&refreshed, time_range, limit).await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(SpotifyError::Api(response.status()));
        }
        let payload: serde_json::Value = response.json().await?;
        Ok(parse_track_items(&payload))
    }

    async fn get_top_tracks(
        &self,
        access_token: &str,
        time_range: &str,
        limit: usize,
    ) -> Result<reqwest::Response, SpotifyError> {
        let response = self
            .http
            .get(format!("{}/me/top/tracks", self.api_base))
            .query(&[
                ("limit", limit.min(50).to_string()),
                ("time_range", time_range.to_string()),
            ])
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(response)
    }

    /// The user's saved tracks, following pagination until `cap` entries or
    /// the first failing page. Failures mid-pagination keep what was
    /// collected so far, matching the best-effort nature of library sync.
    pub async fn saved_tracks(
        &self,
        access_token: &str,
        cap: usize,
    ) -> Result<Vec<PlatformTrack>, SpotifyError> {
        let mut collected = Vec::new();
        let mut next_url = Some(format!("{}/me/tracks?limit=50", self.api_base));

        while let Some(url) = next_url {
            if collected.len() >= cap {
                break;
            }
            let response = self.http.get(&url).bearer_auth(access_token).send().await?;
            if !response.status().is_success() {
                break;
            }
            let payload: serde_json::Value = response.json().await?;
            for track in parse_track_items(&payload) {
                collected.push(track);
                if collected.len() >= cap {
                    break;
                }
            }
            next_url = payload
                .get("next")
                .and_then(|value| value.as_str())
                .map(str::to_string);
        }
        Ok(collected)
    }
}

/// Extract tracks from an `items` collection. Each item is either a bare
/// track object or a wrapper with a `track` key (saved-tracks shape);
/// entries without both URI and name are dropped.
pub fn parse_track_items(payload: &serde_json::Value) -> Vec<PlatformTrack> {
    let items = match payload.get("items").and_then(|value| value.as_array()) {
        Some(items) => items,
        None => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| {
            let track = item.get("track").unwrap_or(item);
            let uri = track.get("uri").and_then(|value| value.as_str())?;
            let name = track.get("name").and_then(|value| value.as_str())?;
            let artists = track
                .get("artists")
                .and_then(|value| value.as_array())
                .map(|artists| {
                    artists
                        .iter()
                        .filter_map(|artist| artist.get("name").and_then(|name| name.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            Some(PlatformTrack {
                uri: uri.to_string(),
                name: name.to_string(),
                artists,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SqliteUserStore;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_track_items_handles_both_shapes() {
        let payload = json!({
            "items": [
                {"uri": "uri:1", "name": "Bare", "artists": [{"name": "A"}, {"name": "B"}]},
                {"track": {"uri": "uri:2", "name": "Wrapped", "artists": [{"name": "C"}]}},
                {"track": {"name": "No URI"}},
                {"uri": "uri:4"}
            ]
        });
        let tracks = parse_track_items(&payload);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].uri, "uri:1");
        assert_eq!(tracks[0].artists, "A, B");
        assert_eq!(tracks[1].name, "Wrapped");
    }

    #[test]
    fn test_parse_track_items_without_items() {
        assert!(parse_track_items(&json!({"error": "nope"})).is_empty());
    }

    struct MockState {
        /// Count of top-tracks calls carrying the stale token.
        stale_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    async fn mock_top_tracks(
        State(state): State<Arc<MockState>>,
        headers: HeaderMap,
    ) -> (axum::http::StatusCode, Json<serde_json::Value>) {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if authorization != "Bearer fresh-token" {
            state.stale_calls.fetch_add(1, Ordering::SeqCst);
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(json!({"error": "expired"})),
            );
        }
        (
            axum::http::StatusCode::OK,
            Json(json!({
                "items": [
                    {"uri": "uri:1", "name": "One", "artists": [{"name": "A"}]}
                ]
            })),
        )
    }

    async fn mock_token(State(state): State<Arc<MockState>>) -> Json<serde_json::Value> {
        state.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Json(json!({"access_token": "fresh-token", "expires_in": 3600}))
    }

    async fn spawn_mock(state: Arc<MockState>) -> String {
        let app = Router::new()
            .route("/v1/me/top/tracks", get(mock_top_tracks))
            .route("/api/token", post(mock_token))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_401_triggers_exactly_one_refresh_and_retry() {
        let state = Arc::new(MockState {
            stale_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        });
        let base = spawn_mock(Arc::clone(&state)).await;

        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        // Token looks valid (far expiry) but the API rejects it, forcing
        // the reactive 401 path rather than the proactive one.
        store
            .upsert_platform_token(&PlatformToken {
                user_id: "u1".to_string(),
                access_token: "stale-token".to_string(),
                refresh_token: Some("refresh-1".to_string()),
                expires_at: chrono::Utc::now().timestamp() + 10_000,
            })
            .unwrap();

        let client = SpotifyClient::with_endpoints(
            Some("id".to_string()),
            Some("secret".to_string()),
            &format!("{base}/v1"),
            &format!("{base}/api/token"),
        )
        .unwrap();

        let tracks = client
            .top_tracks_for_user(&store, "u1", "medium_term", 10)
            .await
            .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(state.stale_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);

        // The refreshed token was persisted for the next call.
        let stored = store.get_platform_token("u1").unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh-token");
    }

    #[tokio::test]
    async fn test_unlinked_user_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        let client = SpotifyClient::new(None, None).unwrap();
        let result = client.ensure_access_token(&store, "nobody").await;
        assert!(matches!(result, Err(SpotifyError::NotLinked)));
    }

    #[tokio::test]
    async fn test_refresh_without_credentials_fails() {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        let client = SpotifyClient::new(None, None).unwrap();
        let token = PlatformToken {
            user_id: "u1".to_string(),
            access_token: "stale".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: 0,
        };
        let result = client.refresh_access_token(&store, &token).await;
        assert!(matches!(result, Err(SpotifyError::CredentialsMissing)));
    }
}
