use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub feed: FeedConfig,
    pub precompute: PrecomputeConfig,
    pub trends: TrendsConfig,
    #[serde(default)]
    pub candidates: CandidatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!("unknown store backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
}

/// Serving-side limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub for_you_enabled: bool,
    pub home_enabled: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 40,
            for_you_enabled: true,
            home_enabled: true,
        }
    }
}

/// How a precompute result lands in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Upsert changed entries, then remove the ones no longer produced
    Incremental,
    /// Build aside and rename over the live index
    Swap,
}

impl FromStr for ApplyMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "incremental" => Ok(ApplyMode::Incremental),
            "swap" => Ok(ApplyMode::Swap),
            other => Err(AppError::Config(format!("unknown apply mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputeConfig {
    pub regeneration_ttl_secs: u64,
    pub source_timeout_secs: u64,
    pub capacity: usize,
    pub apply_mode: ApplyMode,
    pub interval_secs: u64,
    pub max_accounts_per_cycle: usize,
    pub candidate_limit: usize,
}

impl PrecomputeConfig {
    pub fn regeneration_ttl(&self) -> Duration {
        Duration::from_secs(self.regeneration_ttl_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PrecomputeConfig {
    fn default() -> Self {
        Self {
            regeneration_ttl_secs: 3600,
            source_timeout_secs: 30,
            capacity: 800,
            apply_mode: ApplyMode::Incremental,
            interval_secs: 300,
            max_accounts_per_cycle: 500,
            candidate_limit: 400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsConfig {
    pub enabled: bool,
    pub source_url: String,
    pub fetch_limit: usize,
    pub page_size: usize,
    pub resolve_concurrency: usize,
    pub http_timeout_secs: u64,
}

impl TrendsConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_url: default_trends_source_url(),
            fetch_limit: 40,
            page_size: 20,
            resolve_concurrency: 8,
            http_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandidatesConfig {
    /// Candidate/aggregates service; Home and For You precompute is off without it
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_candidates_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let feed_defaults = FeedConfig::default();
        let precompute_defaults = PrecomputeConfig::default();
        let trends_defaults = TrendsConfig::default();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            store: StoreConfig {
                backend: env_or("FEED_STORE_BACKEND", StoreBackend::Redis)?,
                redis_url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            feed: FeedConfig {
                default_limit: env_or("FEED_DEFAULT_LIMIT", feed_defaults.default_limit)?,
                max_limit: env_or("FEED_MAX_LIMIT", feed_defaults.max_limit)?,
                for_you_enabled: env_or("FOR_YOU_ENABLED", feed_defaults.for_you_enabled)?,
                home_enabled: env_or("HOME_FEED_ENABLED", feed_defaults.home_enabled)?,
            },
            precompute: PrecomputeConfig {
                regeneration_ttl_secs: env_or(
                    "REGENERATION_TTL_SECS",
                    precompute_defaults.regeneration_ttl_secs,
                )?,
                source_timeout_secs: env_or(
                    "PRECOMPUTE_SOURCE_TIMEOUT_SECS",
                    precompute_defaults.source_timeout_secs,
                )?,
                capacity: env_or("FEED_CAPACITY", precompute_defaults.capacity)?,
                apply_mode: env_or("PRECOMPUTE_APPLY_MODE", precompute_defaults.apply_mode)?,
                interval_secs: env_or(
                    "PRECOMPUTE_INTERVAL_SECS",
                    precompute_defaults.interval_secs,
                )?,
                max_accounts_per_cycle: env_or(
                    "PRECOMPUTE_MAX_ACCOUNTS_PER_CYCLE",
                    precompute_defaults.max_accounts_per_cycle,
                )?,
                candidate_limit: env_or(
                    "PRECOMPUTE_CANDIDATE_LIMIT",
                    precompute_defaults.candidate_limit,
                )?,
            },
            trends: TrendsConfig {
                enabled: env_or("TRENDS_ENABLED", trends_defaults.enabled)?,
                source_url: std::env::var("TRENDS_SOURCE_URL")
                    .unwrap_or_else(|_| default_trends_source_url()),
                fetch_limit: env_or("TRENDS_FETCH_LIMIT", trends_defaults.fetch_limit)?,
                page_size: env_or("TRENDS_PAGE_SIZE", trends_defaults.page_size)?,
                resolve_concurrency: env_or(
                    "TRENDS_RESOLVE_CONCURRENCY",
                    trends_defaults.resolve_concurrency,
                )?,
                http_timeout_secs: env_or(
                    "TRENDS_HTTP_TIMEOUT_SECS",
                    trends_defaults.http_timeout_secs,
                )?,
            },
            candidates: CandidatesConfig {
                url: std::env::var("CANDIDATES_URL").ok().filter(|v| !v.is_empty()),
                timeout_secs: env_or("CANDIDATES_TIMEOUT_SECS", default_candidates_timeout_secs())?,
            },
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
/// A set but unparsable value is a configuration error.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} is invalid: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn default_trends_source_url() -> String {
    "https://sfba.social".to_string()
}

fn default_candidates_timeout_secs() -> u64 {
    10
}
