mod file_config;

pub use file_config::{FileConfig, PlatformConfig, RankingConfig};

use crate::recommend::HybridWeights;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub catalog_db: Option<PathBuf>,
    pub user_db: Option<PathBuf>,
    pub port: u16,
    pub ranking_url: Option<String>,
    pub ranking_timeout_sec: u64,
    pub exploration: f64,
    pub seed_limit: usize,
    pub platform_client_id: Option<String>,
    pub platform_client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_db: PathBuf,
    pub user_db: PathBuf,
    pub port: u16,
    pub ranking: RankingSettings,
    pub platform: PlatformSettings,
}

#[derive(Debug, Clone)]
pub struct RankingSettings {
    /// External ranking delegate base URL; unset means local blend only.
    pub url: Option<String>,
    pub timeout_sec: u64,
    pub seed_limit: usize,
    pub exploration: f64,
    pub weights: HybridWeights,
}

impl Default for RankingSettings {
    fn default() -> Self {
        RankingSettings {
            url: None,
            timeout_sec: 10,
            seed_limit: 3,
            exploration: 0.05,
            weights: HybridWeights::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub sync_cooldown_sec: u64,
    pub saved_tracks_limit: usize,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        PlatformSettings {
            client_id: None,
            client_secret: None,
            sync_cooldown_sec: 300,
            saved_tracks_limit: 400,
        }
    }
}

fn unit_interval(name: &str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{name} must be within [0, 1], got {value}");
    }
    Ok(value)
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let catalog_db = file
            .catalog_db
            .map(PathBuf::from)
            .or_else(|| cli.catalog_db.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("catalog_db must be specified via CLI or in config file")
            })?;
        if !catalog_db.exists() {
            bail!("Catalog database does not exist: {:?}", catalog_db);
        }
        if !catalog_db.is_file() {
            bail!("catalog_db is not a file: {:?}", catalog_db);
        }

        let user_db = file
            .user_db
            .map(PathBuf::from)
            .or_else(|| cli.user_db.clone())
            .unwrap_or_else(|| {
                catalog_db
                    .parent()
                    .map(|parent| parent.join("user.db"))
                    .unwrap_or_else(|| PathBuf::from("user.db"))
            });

        let port = file.port.unwrap_or(cli.port);

        let ranking_file = file.ranking.unwrap_or_default();
        let defaults = RankingSettings::default();
        let ranking = RankingSettings {
            url: ranking_file.url.or_else(|| cli.ranking_url.clone()),
            timeout_sec: ranking_file.timeout_sec.unwrap_or(cli.ranking_timeout_sec),
            seed_limit: ranking_file.seed_limit.unwrap_or(cli.seed_limit).max(1),
            exploration: unit_interval(
                "exploration",
                ranking_file.exploration.unwrap_or(cli.exploration),
            )?,
            weights: HybridWeights {
                alpha: unit_interval("alpha", ranking_file.alpha.unwrap_or(defaults.weights.alpha))?,
                beta: unit_interval("beta", ranking_file.beta.unwrap_or(defaults.weights.beta))?,
                gamma: unit_interval("gamma", ranking_file.gamma.unwrap_or(defaults.weights.gamma))?,
            },
        };

        let platform_file = file.platform.unwrap_or_default();
        let platform_defaults = PlatformSettings::default();
        let platform = PlatformSettings {
            client_id: platform_file
                .client_id
                .or_else(|| cli.platform_client_id.clone()),
            client_secret: platform_file
                .client_secret
                .or_else(|| cli.platform_client_secret.clone()),
            sync_cooldown_sec: platform_file
                .sync_cooldown_sec
                .unwrap_or(platform_defaults.sync_cooldown_sec),
            saved_tracks_limit: platform_file
                .saved_tracks_limit
                .unwrap_or(platform_defaults.saved_tracks_limit),
        };

        Ok(AppConfig {
            catalog_db,
            user_db,
            port,
            ranking,
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn make_catalog_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("catalog.db");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"")
            .unwrap();
        path
    }

    fn base_cli(catalog_db: PathBuf) -> CliConfig {
        CliConfig {
            catalog_db: Some(catalog_db),
            port: 3001,
            ranking_timeout_sec: 10,
            exploration: 0.05,
            seed_limit: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let dir = TempDir::new().unwrap();
        let catalog_db = make_catalog_db(&dir);
        let cli = CliConfig {
            ranking_url: Some("http://ranking:8000".to_string()),
            ..base_cli(catalog_db.clone())
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.catalog_db, catalog_db);
        assert_eq!(config.user_db, dir.path().join("user.db"));
        assert_eq!(config.port, 3001);
        assert_eq!(config.ranking.url.as_deref(), Some("http://ranking:8000"));
        assert_eq!(config.ranking.seed_limit, 3);
        assert_eq!(config.ranking.weights.alpha, 0.5);
        assert_eq!(config.platform.sync_cooldown_sec, 300);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let dir = TempDir::new().unwrap();
        let catalog_db = make_catalog_db(&dir);
        let cli = base_cli(catalog_db);

        let file = FileConfig {
            port: Some(4000),
            ranking: Some(RankingConfig {
                url: Some("http://other:9000".to_string()),
                exploration: Some(0.2),
                alpha: Some(0.7),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.ranking.url.as_deref(), Some("http://other:9000"));
        assert_eq!(config.ranking.exploration, 0.2);
        assert_eq!(config.ranking.weights.alpha, 0.7);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.ranking.timeout_sec, 10);
    }

    #[test]
    fn test_resolve_missing_catalog_db_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("catalog_db must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_catalog_db_error() {
        let cli = CliConfig {
            catalog_db: Some(PathBuf::from("/nonexistent/catalog.db")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_out_of_range_weight_rejected() {
        let dir = TempDir::new().unwrap();
        let cli = base_cli(make_catalog_db(&dir));
        let file = FileConfig {
            ranking: Some(RankingConfig {
                beta: Some(1.5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, Some(file));
        assert!(result.unwrap_err().to_string().contains("beta"));
    }

    #[test]
    fn test_out_of_range_exploration_rejected() {
        let dir = TempDir::new().unwrap();
        let cli = CliConfig {
            exploration: 2.0,
            ..base_cli(make_catalog_db(&dir))
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_seed_limit_floors_at_one() {
        let dir = TempDir::new().unwrap();
        let cli = CliConfig {
            seed_limit: 0,
            ..base_cli(make_catalog_db(&dir))
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.ranking.seed_limit, 1);
    }
}
