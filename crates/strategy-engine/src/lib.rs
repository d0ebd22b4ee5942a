//! The strategy thread: consumes ticks off the SPSC queue, maintains
//! per-symbol books, evaluates the trading signals and emits risk-gated
//! orders.

pub mod engine;
pub mod signals;

pub use engine::{StrategyConfig, StrategyEngine};
