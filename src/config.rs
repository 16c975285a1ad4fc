use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub expansion: ExpansionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

/// Startup parameters for the supervised threat-matching server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_bin")]
    pub bin: String,
    #[serde(default = "default_server_address")]
    pub address: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

/// Persistent terminal-URL membership cache.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_error_rate")]
    pub error_rate: f64,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpansionConfig {
    #[serde(default = "default_expansion_enable")]
    pub enable: bool,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enable")]
    pub enable: bool,
    #[serde(default = "default_stats_interval")]
    pub log_interval_secs: u64,
}

// Defaults
fn default_server_bin() -> String {
    "sbserver".to_string()
}
fn default_server_address() -> String {
    "127.0.0.1:8831".to_string()
}
fn default_db_path() -> String {
    "training/google_safebrowsing.db".to_string()
}
fn default_startup_timeout_ms() -> u64 {
    10_000
}
fn default_health_poll_interval_ms() -> u64 {
    100
}
fn default_lookup_timeout_ms() -> u64 {
    5_000
}
fn default_cache_path() -> String {
    "training/urls.bloom".to_string()
}
fn default_cache_capacity() -> usize {
    1_000_000
}
fn default_cache_error_rate() -> f64 {
    0.01
}
fn default_flush_interval() -> u64 {
    300
}
fn default_expansion_enable() -> bool {
    true
}
fn default_probe_timeout_ms() -> u64 {
    1_500
}
fn default_max_hops() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_stats_enable() -> bool {
    true
}
fn default_stats_interval() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bin: default_server_bin(),
            address: default_server_address(),
            api_key: String::new(),
            db_path: default_db_path(),
            startup_timeout_ms: default_startup_timeout_ms(),
            health_poll_interval_ms: default_health_poll_interval_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            capacity: default_cache_capacity(),
            error_rate: default_cache_error_rate(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            enable: default_expansion_enable(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_hops: default_max_hops(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_stats_enable(),
            log_interval_secs: default_stats_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}
