use crate::limits::RiskConfig;
use market_core::{Price, PriceFixed, Quantity, Side, SymbolId};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::warn;

/// Why a candidate order was refused. Checks run in declaration order and
/// the first failure wins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskRejection {
    #[error("order size {size} exceeds limit {limit}")]
    OversizedOrder { size: Quantity, limit: Quantity },
    #[error("projected position {projected} exceeds limit {limit}")]
    PositionLimitExceeded { projected: f64, limit: f64 },
    #[error("price {price} outside band around reference {reference}")]
    PriceOutOfBand { price: Price, reference: Price },
    #[error("order rate exceeds {limit} per window")]
    RateLimitExceeded { limit: u32 },
}

/// Pre-trade gate sitting between the strategy and the gateway.
///
/// Checked state (rate window) belongs to the strategy thread, which is the
/// only caller of [`check`](RiskGate::check). The net position is an atomic
/// scalar so other threads may read it for telemetry; only the strategy
/// mutates it, at send time (conservative: exposure is counted when the
/// order goes out, not when it fills).
///
/// All timing uses the monotonic clock; wall-clock adjustments must never
/// reshape the rate window.
#[derive(Debug)]
pub struct RiskGate {
    config: RiskConfig,
    /// Net position as raw fixed-point bits (signed quantity).
    position_bits: AtomicI64,
    orders_in_window: u32,
    window_start: Instant,
}

impl RiskGate {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            position_bits: AtomicI64::new(0),
            orders_in_window: 0,
            window_start: Instant::now(),
        }
    }

    #[inline]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Validate a candidate order against the configured limits. On approval
    /// the rate-window counter is consumed.
    #[inline]
    pub fn check(
        &mut self,
        symbol: SymbolId,
        side: Side,
        price: Price,
        quantity: Quantity,
        reference_price: Price,
    ) -> Result<(), RiskRejection> {
        self.check_at(Instant::now(), symbol, side, price, quantity, reference_price)
    }

    /// Clock-explicit variant of [`check`](Self::check); behavior is fully
    /// deterministic given the sequence of `now` values.
    fn check_at(
        &mut self,
        now: Instant,
        symbol: SymbolId,
        side: Side,
        price: Price,
        quantity: Quantity,
        reference_price: Price,
    ) -> Result<(), RiskRejection> {
        if quantity > self.config.max_order_size {
            let rejection = RiskRejection::OversizedOrder {
                size: quantity,
                limit: self.config.max_order_size,
            };
            warn!(%symbol, %rejection, "risk check failed");
            return Err(rejection);
        }

        let projected = match side {
            Side::Buy => self.position() + quantity.to_f64(),
            Side::Sell => self.position() - quantity.to_f64(),
        };
        let position_limit = self.config.max_position.to_f64();
        if projected.abs() > position_limit {
            let rejection = RiskRejection::PositionLimitExceeded {
                projected,
                limit: position_limit,
            };
            warn!(%symbol, %rejection, "risk check failed");
            return Err(rejection);
        }

        if !reference_price.is_zero() {
            let deviation =
                (price - reference_price).abs().to_f64() / reference_price.to_f64();
            if deviation > self.config.max_price_deviation {
                let rejection = RiskRejection::PriceOutOfBand {
                    price,
                    reference: reference_price,
                };
                warn!(%symbol, %rejection, "risk check failed");
                return Err(rejection);
            }
        }

        if now.duration_since(self.window_start) >= self.config.window {
            self.window_start = now;
            self.orders_in_window = 0;
        }
        if self.orders_in_window >= self.config.max_order_rate {
            let rejection = RiskRejection::RateLimitExceeded {
                limit: self.config.max_order_rate,
            };
            warn!(%symbol, %rejection, "risk check failed");
            return Err(rejection);
        }

        self.orders_in_window += 1;
        Ok(())
    }

    /// Fold a dispatched order into the net position. Called by the strategy
    /// right after the gateway accepts the order.
    #[inline]
    pub fn update_position(&self, side: Side, quantity: Quantity) {
        // Fixed-point addition is plain integer addition on the raw bits.
        let delta = quantity.to_raw() as i64;
        match side {
            Side::Buy => self.position_bits.fetch_add(delta, Ordering::Relaxed),
            Side::Sell => self.position_bits.fetch_sub(delta, Ordering::Relaxed),
        };
    }

    /// Current net position as a signed quantity.
    #[inline]
    pub fn position(&self) -> f64 {
        PriceFixed::from_bits(self.position_bits.load(Ordering::Relaxed)).to_num()
    }
}
