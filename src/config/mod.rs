//! Configuration management for the squeeze scanner.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Market data and short interest provider settings
    #[serde(default)]
    pub providers: ProviderConfig,
    /// Per-scan timing and concurrency limits
    #[serde(default)]
    pub scan: ScanConfig,
    /// Batch-size planning parameters
    #[serde(default)]
    pub planner: PlannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the chart endpoint used for prices
    #[serde(default = "default_price_base_url")]
    pub price_base_url: String,
    /// Base URL of the short interest provider
    #[serde(default = "default_short_interest_base_url")]
    pub short_interest_base_url: String,
    /// Fallback credential for the short interest provider (empty = none)
    #[serde(default)]
    pub short_interest_api_key: String,
    /// User agent sent with every provider request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Overall wall-clock budget for a scan in seconds
    #[serde(default = "default_timeout_budget")]
    pub timeout_budget_secs: u64,
    /// Batch size requested when the caller does not ask for one
    #[serde(default = "default_max_tickers")]
    pub default_max_tickers: usize,
    /// Maximum price fetches in flight at once
    #[serde(default = "default_price_concurrency")]
    pub price_concurrency: usize,
    /// Timeout for a single price fetch in milliseconds
    #[serde(default = "default_price_call_timeout")]
    pub price_call_timeout_ms: u64,
    /// Hard ceiling on the whole price fetch stage in seconds
    #[serde(default = "default_price_deadline")]
    pub price_deadline_secs: u64,
    /// Timeout for a single short interest request in milliseconds
    #[serde(default = "default_short_interest_timeout")]
    pub short_interest_timeout_ms: u64,
    /// Live short interest is only attempted when at most this many symbols are priced
    #[serde(default = "default_live_lookup_max_priced")]
    pub live_lookup_max_priced: usize,
    /// Number of priced symbols to attempt live short interest for
    #[serde(default = "default_live_lookup_limit")]
    pub live_lookup_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Seconds per symbol assumed before the first scan completes
    #[serde(default = "default_avg_time_per_symbol")]
    pub initial_avg_time_per_symbol: Decimal,
    /// Absolute ceiling on batch size regardless of timing
    #[serde(default = "default_max_safe_batch_size")]
    pub max_safe_batch_size: usize,
}

// Default value functions
fn default_price_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_short_interest_base_url() -> String {
    "https://api.ortex.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; SqueezeScanner/1.0)".to_string()
}

fn default_timeout_budget() -> u64 {
    45
}

fn default_max_tickers() -> usize {
    20
}

fn default_price_concurrency() -> usize {
    12
}

fn default_price_call_timeout() -> u64 {
    4_000
}

fn default_price_deadline() -> u64 {
    30
}

fn default_short_interest_timeout() -> u64 {
    3_000
}

fn default_live_lookup_max_priced() -> usize {
    10
}

fn default_live_lookup_limit() -> usize {
    5
}

fn default_avg_time_per_symbol() -> Decimal {
    Decimal::new(25, 1) // 2.5 seconds
}

fn default_max_safe_batch_size() -> usize {
    20
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("SQZ"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.scan.timeout_budget_secs > 0,
            "timeout_budget_secs must be positive"
        );

        anyhow::ensure!(
            self.scan.price_concurrency >= 1,
            "price_concurrency must be at least 1"
        );

        anyhow::ensure!(
            self.scan.price_call_timeout_ms > 0 && self.scan.short_interest_timeout_ms > 0,
            "per-call timeouts must be positive"
        );

        anyhow::ensure!(
            self.scan.price_deadline_secs > 0
                && self.scan.price_deadline_secs <= self.scan.timeout_budget_secs,
            "price_deadline_secs must be positive and within timeout_budget_secs"
        );

        anyhow::ensure!(
            self.scan.default_max_tickers >= 1,
            "default_max_tickers must be at least 1"
        );

        anyhow::ensure!(
            self.planner.initial_avg_time_per_symbol > Decimal::ZERO,
            "initial_avg_time_per_symbol must be positive"
        );

        anyhow::ensure!(
            self.planner.max_safe_batch_size >= 1,
            "max_safe_batch_size must be at least 1"
        );

        Ok(())
    }

    /// Credential configured for the short interest provider, if any.
    pub fn short_interest_credential(&self) -> Option<&str> {
        let key = self.providers.short_interest_api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

impl ScanConfig {
    pub fn price_call_timeout(&self) -> Duration {
        Duration::from_millis(self.price_call_timeout_ms)
    }

    pub fn price_deadline(&self) -> Duration {
        Duration::from_secs(self.price_deadline_secs)
    }

    pub fn short_interest_timeout(&self) -> Duration {
        Duration::from_millis(self.short_interest_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProviderConfig::default(),
            scan: ScanConfig::default(),
            planner: PlannerConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            price_base_url: default_price_base_url(),
            short_interest_base_url: default_short_interest_base_url(),
            short_interest_api_key: String::new(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_budget_secs: default_timeout_budget(),
            default_max_tickers: default_max_tickers(),
            price_concurrency: default_price_concurrency(),
            price_call_timeout_ms: default_price_call_timeout(),
            price_deadline_secs: default_price_deadline(),
            short_interest_timeout_ms: default_short_interest_timeout(),
            live_lookup_max_priced: default_live_lookup_max_priced(),
            live_lookup_limit: default_live_lookup_limit(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            initial_avg_time_per_symbol: default_avg_time_per_symbol(),
            max_safe_batch_size: default_max_safe_batch_size(),
        }
    }
}
