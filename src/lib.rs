//! # tickcore: tick-to-trade execution core
//!
//! A low-latency trading engine core:
//! - Wait-free SPSC ring buffer between ingest and strategy
//! - Pre-allocated order pool, no hot-path heap activity
//! - Triangular-arbitrage and order-book-imbalance signals
//! - Pre-trade risk gate (size, position, price collar, rate limit)
//! - Execution-report-driven order state machine
//! - Linear-bucket tick-to-decision latency histogram

pub mod config;
pub mod utils;

pub use config::EngineConfig;

pub use latency_profiler;
pub use market_core;
pub use market_data;
pub use order_book;
pub use order_gateway;
pub use order_manager;
pub use risk_gate;
pub use spsc_queue;
pub use strategy_engine;

pub type Result<T> = anyhow::Result<T>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
