//! Per-symbol order book state maintained from top-of-book market data.

pub mod book;

pub use book::{OrderBook, PriceLevel};
