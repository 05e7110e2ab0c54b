use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use super::routes;
use super::state::ServerState;

/// Build the application router. Kept separate from `run_server` so tests
/// can mount the app on an ephemeral port.
pub fn make_app(state: ServerState) -> Router {
    let api_routes: Router<ServerState> = Router::new()
        .route("/search", get(routes::search))
        .route("/suggest", get(routes::suggest))
        .route("/song/{uri}", get(routes::song_detail))
        .route("/stats", get(routes::stats))
        .route("/recommend", post(routes::recommend))
        .route("/ranking/hybrid", post(routes::ranking_hybrid))
        .route("/story", get(routes::story))
        .route("/journeys", get(routes::journeys));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        .with_state(state)
}

pub async fn run_server(state: ServerState, port: u16) -> Result<()> {
    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    Ok(axum::serve(listener, app).await?)
}
