use market_core::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// One top-of-book update: best bid/ask price and size for a symbol.
/// This is the unit the whole hot path is built around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookTicker {
    pub symbol: String,
    /// Monotonic per symbol at the exchange.
    pub update_id: i64,
    pub best_bid_price: Price,
    pub best_bid_qty: Quantity,
    pub best_ask_price: Price,
    pub best_ask_qty: Quantity,
}

/// Handler a source invokes for every tick. Runs on the source's own
/// (network/replay) thread and must stay cheap and non-blocking: the
/// production wiring pushes into the SPSC queue and nothing else.
pub type TickerCallback = Arc<dyn Fn(BookTicker) + Send + Sync>;

/// Anything that, once started, produces `BookTicker` values into a
/// configured callback. The live WebSocket feed and the CSV replay are the
/// two realizations; the strategy side cannot tell them apart.
pub trait MarketDataSource {
    fn set_callback(&mut self, callback: TickerCallback);

    /// Run the source until it finishes or is asked to stop. Blocking; the
    /// caller gives the source a dedicated thread.
    fn run(&mut self) -> Result<(), MarketDataError>;
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("websocket transport: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no callback configured")]
    NoCallback,
}

/// Per-message failure: the message is logged and skipped, never fatal.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field {field} is not a decimal number: {value:?}")]
    Number { field: &'static str, value: String },
    #[error("expected {expected} comma-separated fields, got {got}")]
    FieldCount { expected: usize, got: usize },
}
