//! Engine configuration: TOML-loadable with sane defaults for the demo
//! triangle.

use crate::Result;
use anyhow::Context;
use order_gateway::GatewayConfig;
use risk_gate::RiskConfig;
use serde::{Deserialize, Serialize};
use strategy_engine::StrategyConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exchange symbols to subscribe to. Must cover the strategy triangle.
    pub symbols: Vec<String>,
    /// SPSC queue slots (power of two).
    pub queue_capacity: usize,
    /// Order pool slots; bounds live orders per session.
    pub order_pool_capacity: usize,
    /// Path of the append-only execution journal.
    pub execution_log: String,
    /// When set, replay this CSV capture instead of connecting live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_file: Option<String>,
    /// Core to pin the strategy thread to.
    pub strategy_core: Option<usize>,
    /// Core to pin the market-data thread to.
    pub network_core: Option<usize>,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub gateway: GatewayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHBTC".to_string(),
                "ETHUSDT".to_string(),
            ],
            queue_capacity: 1024,
            order_pool_capacity: order_manager::DEFAULT_POOL_CAPACITY,
            execution_log: "execution_log.txt".to_string(),
            replay_file: None,
            strategy_core: Some(1),
            network_core: Some(2),
            strategy: StrategyConfig::default(),
            risk: RiskConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {path}"))?;
        let config: EngineConfig =
            toml::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
