//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Recurring scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Depreciation runner configuration.
    #[serde(default)]
    pub depreciation: DepreciationConfig,
    /// External classification oracle configuration.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Recurring scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the background tick runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between full sweeps.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Rules processed concurrently within one sweep.
    #[serde(default = "default_max_concurrent_rules")]
    pub max_concurrent_rules: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_secs: default_tick_interval(),
            max_concurrent_rules: default_max_concurrent_rules(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    60
}

fn default_max_concurrent_rules() -> usize {
    8
}

/// Depreciation runner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DepreciationConfig {
    /// Whether the depreciation timer runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between runs.
    #[serde(default = "default_depreciation_interval")]
    pub interval_secs: u64,
    /// Maximum assets processed per run.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u64,
}

impl Default for DepreciationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_depreciation_interval(),
            batch_limit: default_batch_limit(),
        }
    }
}

fn default_depreciation_interval() -> u64 {
    3600 // 1 hour
}

fn default_batch_limit() -> u64 {
    100
}

/// External classification oracle configuration.
///
/// The oracle tier is disabled when `endpoint` is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// HTTP endpoint of the classification service.
    pub endpoint: Option<String>,
    /// Bearer token for the classification service.
    pub api_key: Option<String>,
    /// Model name forwarded to the service.
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard timeout for a single classification call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sustained request rate.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Burst capacity of the token bucket.
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Time-to-live of cached answers.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Maximum cached answers.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_model() -> String {
    "account-classifier-v1".to_string()
}

fn default_timeout_ms() -> u64 {
    2500
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_burst() -> u32 {
    5
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_cache_capacity() -> u64 {
    1000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
