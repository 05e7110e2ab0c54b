//! Test server lifecycle management.
//!
//! Each test gets an isolated server on an ephemeral port with its own
//! catalog and user databases, torn down when the handle drops.

use super::fixtures::create_test_catalog_db;
use notethrough_server::catalog::load_catalog;
use notethrough_server::catalog_store::SqliteCatalogStore;
use notethrough_server::config::RankingSettings;
use notethrough_server::features::FeatureCache;
use notethrough_server::recommend::{RankingDelegate, Recommender};
use notethrough_server::search::SearchIndex;
use notethrough_server::server::{make_app, ServerState};
use notethrough_server::stats::SummaryCache;
use notethrough_server::user::SqliteUserStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// User store for direct database access in tests
    pub user_store: Arc<SqliteUserStore>,

    // Keep temp resources alive until drop
    _temp_dir: TempDir,
}

impl TestServer {
    /// Spawn a server over the fixture catalog with local-only ranking.
    pub async fn spawn() -> TestServer {
        Self::spawn_with_delegate(None).await
    }

    /// Spawn a server whose recommender calls the given ranking delegate.
    pub async fn spawn_with_delegate(ranking_url: Option<String>) -> TestServer {
        let temp_dir = TempDir::new().expect("create temp dir");
        let catalog_db = temp_dir.path().join("catalog.db");
        create_test_catalog_db(&catalog_db);

        let store = SqliteCatalogStore::new(&catalog_db).expect("open catalog store");
        let catalog = Arc::new(load_catalog(&store).expect("load catalog"));

        let features = Arc::new(FeatureCache::new());
        features.build(&catalog);
        let search_index = Arc::new(SearchIndex::build(&catalog));
        let summary = Arc::new(SummaryCache::new());
        summary.build(&catalog);

        let user_store =
            Arc::new(SqliteUserStore::new(temp_dir.path().join("user.db")).expect("user store"));

        let ranking = RankingSettings {
            url: ranking_url.clone(),
            ..RankingSettings::default()
        };
        let delegate = ranking_url.as_deref().map(|url| {
            RankingDelegate::new(url, Duration::from_secs(2)).expect("delegate client")
        });
        let recommender = Arc::new(Recommender::new(
            Arc::clone(&features),
            delegate,
            ranking.seed_limit,
            ranking.exploration,
            ranking.weights,
        ));

        let state = ServerState {
            ranking,
            start_time: Instant::now(),
            catalog,
            features,
            search_index,
            summary,
            recommender,
            user_store: user_store.clone(),
            syncer: None,
            hash: "test".to_string(),
        };

        let app = make_app(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        TestServer {
            base_url: format!("http://{addr}"),
            user_store,
            _temp_dir: temp_dir,
        }
    }
}
