mod store;

pub use store::SqliteUserStore;

use anyhow::Result;

/// OAuth token material for a linked platform account. The authorization
/// exchange that first creates these rows happens out of band; the server
/// only reads them and writes back refreshed access tokens.
#[derive(Debug, Clone)]
pub struct PlatformToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds; 0 means "unknown, treat as expired".
    pub expires_at: i64,
}

/// Persistence for per-user platform state: tokens and the synced library.
pub trait UserStore: Send + Sync {
    fn get_platform_token(&self, user_id: &str) -> Result<Option<PlatformToken>>;

    fn upsert_platform_token(&self, token: &PlatformToken) -> Result<()>;

    /// Replace the user's library rows wholesale with (uri, weight) pairs.
    fn replace_user_tracks(&self, user_id: &str, weights: &[(String, f64)]) -> Result<()>;

    /// The user's library ordered by weight descending, bounded by `limit`.
    fn user_tracks(&self, user_id: &str, limit: usize) -> Result<Vec<(String, f64)>>;
}
