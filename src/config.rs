//! Application configuration.
//!
//! `config.toml` holds four tables: `[app]`, `[llm]`, `[analytics]` and
//! `[dashboard]`. The file never contains secrets; `[llm]` names the
//! environment variable that holds the API key.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

/// Everything read from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: GeneralConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub name: String,
    /// JSON file backing the key-value store
    pub data_file: String,
    /// Seed demo clients when the store is empty
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// "anthropic" | "offline"
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

/// Thresholds for the analytics and recommendation engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Drift (percentage points) above which a rebalance is recommended.
    pub drift_threshold: f64,
    /// Drift above which the rebalance becomes high priority.
    pub high_drift_threshold: f64,
    /// Equity overweight tolerated above the model target.
    pub equity_tolerance_pct: f64,
    /// Single holding weight limit.
    pub concentration_limit_pct: f64,
    /// Single sector weight limit.
    pub sector_limit_pct: f64,
    /// Risk profiles older than this are stale.
    pub risk_review_days: i64,
    /// Idle cash above this amount triggers an invest-cash action.
    pub idle_cash_threshold: Decimal,
    /// Cash weight tolerated above the model's cash target.
    pub excess_cash_pct: f64,
    /// Smallest rebalance trade worth proposing.
    pub min_trade_amount: Decimal,
    /// Projected/target ratio at or above which a goal is merely at risk.
    pub at_risk_ratio: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            drift_threshold: 5.0,
            high_drift_threshold: 10.0,
            equity_tolerance_pct: 10.0,
            concentration_limit_pct: 20.0,
            sector_limit_pct: 35.0,
            risk_review_days: 365,
            idle_cash_threshold: dec!(25000),
            excess_cash_pct: 5.0,
            min_trade_amount: dec!(250),
            at_risk_ratio: 0.8,
        }
    }
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Read and parse a config file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Value of the environment variable named in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
