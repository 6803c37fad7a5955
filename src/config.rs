//! Configuration loading from TOML files and environment variables

use crate::types::{
    EntryConditions, ExitConditions, RiskTolerance, SecurityRequirement, Strategy,
};
use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent pool sizes
    #[serde(default)]
    pub pools: PoolsConfig,

    /// Trading limits and execution mode
    #[serde(default)]
    pub trading: TradingConfig,

    /// Chain RPC collaborator
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Dashboard sync (workers) endpoint
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Optional LLM reasoning engine
    #[serde(default)]
    pub llm: Option<LlmConfig>,

    /// Optional persistence store
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Strategy overrides; built-ins apply when empty
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsConfig {
    #[serde(default = "default_scouts")]
    pub scouts: usize,

    #[serde(default = "default_analysts")]
    pub analysts: usize,

    #[serde(default = "default_hunters")]
    pub hunters: usize,

    #[serde(default = "default_traders")]
    pub traders: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Real chain submission; simulation when false
    #[serde(default)]
    pub enable_trading: bool,

    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,

    /// Position size cap in SOL
    #[serde(default = "default_max_position_size")]
    pub max_position_size_sol: f64,

    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    /// Simulated wallet balance at start
    #[serde(default = "default_initial_balance")]
    pub initial_balance_sol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Dashboard push URL; sync is off without one
    #[serde(default)]
    pub url: Option<String>,

    /// Bearer token
    #[serde(default)]
    pub api_secret: Option<String>,

    #[serde(default)]
    pub enable_sync: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Per-strategy thresholds, overriding the built-in book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub max_score: f64,
    pub min_liquidity_sol: f64,
    #[serde(default)]
    pub bundles_allowed: bool,
    #[serde(default)]
    pub security_requirements: Vec<SecurityRequirement>,
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
    pub max_hold_hours: f64,
    pub position_size_sol: f64,
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: RiskTolerance,
}

impl StrategyConfig {
    pub fn to_strategy(&self) -> Strategy {
        Strategy {
            name: self.name.clone(),
            entry: EntryConditions {
                max_score: self.max_score,
                min_liquidity_sol: self.min_liquidity_sol,
                bundles_allowed: self.bundles_allowed,
                security_requirements: self.security_requirements.clone(),
            },
            exit: ExitConditions {
                take_profit_percent: self.take_profit_percent,
                stop_loss_percent: self.stop_loss_percent,
                max_hold_time_ms: (self.max_hold_hours * 3_600_000.0) as i64,
            },
            position_size_sol: self.position_size_sol,
            risk_tolerance: self.risk_tolerance,
        }
    }
}

// Default value functions
fn default_scouts() -> usize { 2 }
fn default_analysts() -> usize { 1 }
fn default_hunters() -> usize { 1 }
fn default_traders() -> usize { 1 }
fn default_max_daily_trades() -> u32 { 10 }
fn default_max_position_size() -> f64 { 0.1 }
fn default_slippage_bps() -> u16 { 100 }
fn default_initial_balance() -> f64 { 10.0 }
fn default_rpc_endpoint() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 10 }
fn default_flush_interval() -> u64 { 5 }
fn default_llm_model() -> String { "bitnet-b1.58".to_string() }
fn default_llm_timeout() -> u64 { 10_000 }
fn default_risk_tolerance() -> RiskTolerance { RiskTolerance::Medium }

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            scouts: default_scouts(),
            analysts: default_analysts(),
            hunters: default_hunters(),
            traders: default_traders(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            enable_trading: false,
            max_daily_trades: default_max_daily_trades(),
            max_position_size_sol: default_max_position_size(),
            slippage_bps: default_slippage_bps(),
            initial_balance_sol: default_initial_balance(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_secs: default_rpc_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_secret: None,
            enable_sync: false,
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pools: PoolsConfig::default(),
            trading: TradingConfig::default(),
            rpc: RpcConfig::default(),
            workers: WorkersConfig::default(),
            llm: None,
            database: None,
            strategies: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` overlays applied first
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Strategy book: overrides when configured, built-ins otherwise
    pub fn strategy_book(&self) -> Vec<Strategy> {
        if self.strategies.is_empty() {
            Strategy::builtin()
        } else {
            self.strategies.iter().map(|s| s.to_strategy()).collect()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pools.scouts == 0 {
            anyhow::bail!("at least one scout is required");
        }
        if self.pools.analysts == 0 {
            anyhow::bail!("at least one analyst is required");
        }
        if self.trading.max_position_size_sol <= 0.0 {
            anyhow::bail!("max_position_size_sol must be positive");
        }
        if self.trading.slippage_bps > 10_000 {
            anyhow::bail!(
                "slippage_bps {} exceeds maximum 10000",
                self.trading.slippage_bps
            );
        }
        for strategy in &self.strategies {
            if strategy.stop_loss_percent <= 0.0 || strategy.stop_loss_percent >= 100.0 {
                anyhow::bail!("strategy {}: stop loss out of range", strategy.name);
            }
            if strategy.take_profit_percent <= 0.0 {
                anyhow::bail!("strategy {}: take profit must be positive", strategy.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.pools.scouts, 2);
        assert_eq!(config.pools.analysts, 1);
        assert_eq!(config.pools.hunters, 1);
        assert_eq!(config.pools.traders, 1);
        assert!(!config.trading.enable_trading);
        assert_eq!(config.trading.max_daily_trades, 10);
        assert_eq!(config.trading.max_position_size_sol, 0.1);
        assert_eq!(config.workers.batch_size, 10);
        assert_eq!(config.workers.flush_interval_secs, 5);
        assert!(config.llm.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml = r#"
            [pools]
            scouts = 4

            [trading]
            enable_trading = true
            max_daily_trades = 3

            [workers]
            url = "https://dash.example.com/events"
            api_secret = "s3cret"
            enable_sync = true

            [database]
            path = "/tmp/argus-db"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.pools.scouts, 4);
        assert_eq!(config.pools.analysts, 1);
        assert!(config.trading.enable_trading);
        assert_eq!(config.trading.max_daily_trades, 3);
        assert_eq!(
            config.workers.url.as_deref(),
            Some("https://dash.example.com/events")
        );
        assert_eq!(config.database.as_ref().unwrap().path, "/tmp/argus-db");
    }

    #[test]
    fn test_strategy_override_book() {
        let toml = r#"
            [[strategies]]
            name = "TIGHT"
            max_score = 20.0
            min_liquidity_sol = 50.0
            take_profit_percent = 10.0
            stop_loss_percent = 5.0
            max_hold_hours = 1.0
            position_size_sol = 0.02
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let book = config.strategy_book();
        assert_eq!(book.len(), 1);
        assert_eq!(book[0].name, "TIGHT");
        assert_eq!(book[0].exit.max_hold_time_ms, 3_600_000);

        let default_book = AppConfig::default().strategy_book();
        assert_eq!(default_book.len(), 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.pools.scouts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trading.slippage_bps = 20_000;
        assert!(config.validate().is_err());

        let toml = r#"
            [[strategies]]
            name = "BROKEN"
            max_score = 20.0
            min_liquidity_sol = 50.0
            take_profit_percent = 10.0
            stop_loss_percent = 150.0
            max_hold_hours = 1.0
            position_size_sol = 0.02
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
