use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub score_refresh: ScoreRefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

/// Pagination bounds and the per-request candidate window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub candidate_window: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            candidate_window: default_candidate_window(),
        }
    }
}

impl FeedConfig {
    /// Keep the bounds usable even when the environment is misconfigured.
    pub fn sanitized(self) -> Self {
        let max_page_size = self.max_page_size.max(1);
        Self {
            default_page_size: self.default_page_size.clamp(1, max_page_size),
            max_page_size,
            candidate_window: self.candidate_window.max(max_page_size),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRefreshConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_refresh_window_hours")]
    pub window_hours: i64,
    #[serde(default = "default_refresh_batch_size")]
    pub batch_size: usize,
}

impl Default for ScoreRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_refresh_interval_secs(),
            window_hours: default_refresh_window_hours(),
            batch_size: default_refresh_batch_size(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .context("APP_PORT must be a valid port")?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: env_or("DB_MAX_CONNECTIONS", 8),
                min_connections: env_or("DB_MIN_CONNECTIONS", 2),
                acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 10),
            },
            feed: FeedConfig {
                default_page_size: env_or("FEED_DEFAULT_PAGE_SIZE", default_page_size()),
                max_page_size: env_or("FEED_MAX_PAGE_SIZE", default_max_page_size()),
                candidate_window: env_or("FEED_CANDIDATE_WINDOW", default_candidate_window()),
            }
            .sanitized(),
            score_refresh: ScoreRefreshConfig {
                enabled: env_or("SCORE_REFRESH_ENABLED", true),
                interval_secs: env_or("SCORE_REFRESH_INTERVAL_SECS", default_refresh_interval_secs())
                    .max(1),
                window_hours: env_or("SCORE_REFRESH_WINDOW_HOURS", default_refresh_window_hours())
                    .max(1),
                batch_size: env_or("SCORE_REFRESH_BATCH_SIZE", default_refresh_batch_size()).max(1),
            },
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

fn default_candidate_window() -> usize {
    500
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_refresh_window_hours() -> i64 {
    168
}

fn default_refresh_batch_size() -> usize {
    500
}
