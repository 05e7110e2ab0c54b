use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notethrough_server::catalog::load_catalog;
use notethrough_server::catalog_store::SqliteCatalogStore;
use notethrough_server::config::{AppConfig, CliConfig, FileConfig};
use notethrough_server::features::FeatureCache;
use notethrough_server::recommend::{RankingDelegate, Recommender};
use notethrough_server::search::SearchIndex;
use notethrough_server::server::{run_server, ServerState};
use notethrough_server::spotify::{LibrarySyncer, SpotifyClient};
use notethrough_server::stats::SummaryCache;
use notethrough_server::user::SqliteUserStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite track dataset database file.
    #[clap(value_parser = parse_path)]
    pub catalog_db: PathBuf,

    /// Path to the SQLite database file to use for user storage.
    /// Defaults to user.db next to the catalog database.
    #[clap(long, value_parser = parse_path)]
    pub user_db: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// Base URL of an external ranking delegate service.
    #[clap(long)]
    pub ranking_url: Option<String>,

    /// Timeout in seconds for ranking delegate requests.
    #[clap(long, default_value_t = 10)]
    pub ranking_timeout_sec: u64,

    /// Epsilon-greedy exploration rate for hybrid ranking.
    #[clap(long, default_value_t = 0.05)]
    pub exploration: f64,

    /// Maximum number of seed tracks considered per recommendation request.
    #[clap(long, default_value_t = 3)]
    pub seed_limit: usize,

    /// OAuth client id for the music platform API.
    #[clap(long)]
    pub platform_client_id: Option<String>,

    /// OAuth client secret for the music platform API.
    #[clap(long)]
    pub platform_client_secret: Option<String>,

    /// Path to a TOML config file. TOML values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        catalog_db: Some(cli_args.catalog_db),
        user_db: cli_args.user_db,
        port: cli_args.port,
        ranking_url: cli_args.ranking_url,
        ranking_timeout_sec: cli_args.ranking_timeout_sec,
        exploration: cli_args.exploration,
        seed_limit: cli_args.seed_limit,
        platform_client_id: cli_args.platform_client_id,
        platform_client_secret: cli_args.platform_client_secret,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite catalog database at {:?}...", config.catalog_db);
    let catalog_store = SqliteCatalogStore::new(&config.catalog_db)?;
    let catalog = Arc::new(load_catalog(&catalog_store).context("Failed to load the catalog")?);

    let features = Arc::new(FeatureCache::new());
    features.build(&catalog);

    let search_index = Arc::new(SearchIndex::build(&catalog));

    let summary = Arc::new(SummaryCache::new());
    summary.build(&catalog);

    let user_store = Arc::new(SqliteUserStore::new(&config.user_db)?);

    let delegate = match &config.ranking.url {
        Some(url) => {
            info!("Using ranking delegate at {}", url);
            Some(RankingDelegate::new(
                url,
                Duration::from_secs(config.ranking.timeout_sec),
            )?)
        }
        None => None,
    };
    let recommender = Arc::new(Recommender::new(
        Arc::clone(&features),
        delegate,
        config.ranking.seed_limit,
        config.ranking.exploration,
        config.ranking.weights,
    ));

    let syncer = if config.platform.client_id.is_some() {
        let client = Arc::new(SpotifyClient::new(
            config.platform.client_id.clone(),
            config.platform.client_secret.clone(),
        )?);
        let store: Arc<dyn notethrough_server::user::UserStore> = user_store.clone();
        Some(Arc::new(LibrarySyncer::new(
            client,
            store,
            Duration::from_secs(config.platform.sync_cooldown_sec),
            config.platform.saved_tracks_limit,
        )))
    } else {
        info!("Platform credentials not configured; library sync disabled");
        None
    };

    let state = ServerState {
        ranking: config.ranking.clone(),
        start_time: Instant::now(),
        catalog,
        features,
        search_index,
        summary,
        recommender,
        user_store,
        syncer,
        hash: env!("GIT_HASH").to_string(),
    };

    run_server(state, config.port).await
}
