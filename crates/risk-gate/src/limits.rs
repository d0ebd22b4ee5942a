use market_core::Quantity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static pre-trade limits. Every candidate order passes through these
/// before it may reach the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fat-finger cap: largest quantity a single order may carry.
    pub max_order_size: Quantity,
    /// Largest absolute net position (signed quantity) the book may reach.
    pub max_position: Quantity,
    /// Price collar: maximum fractional deviation from the reference price.
    pub max_price_deviation: f64,
    /// Orders allowed per rate window.
    pub max_order_rate: u32,
    /// Tumbling rate-limit window length.
    pub window: Duration,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_order_size: Quantity::new(10.0),
            max_position: Quantity::new(100.0),
            max_price_deviation: 0.05,
            max_order_rate: 10,
            window: Duration::from_secs(1),
        }
    }
}
