use crate::types::{BookTicker, MarketDataError, MarketDataSource, ParseError, TickerCallback};
use futures::{SinkExt, StreamExt};
use market_core::{Price, Quantity};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_ENDPOINT: &str = "wss://stream.binance.com:9443";
/// How often the read loop wakes up to check the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Combined-stream envelope: `{"stream": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct CombinedStreamMessage {
    #[allow(dead_code)]
    stream: String,
    data: BookTickerMessage,
}

/// Exchange book-ticker payload. Numeric fields arrive as decimal strings
/// and must be parsed as such, never trusted to native JSON floats.
#[derive(Debug, Deserialize)]
struct BookTickerMessage {
    #[serde(rename = "u")]
    update_id: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bid_price: String,
    #[serde(rename = "B")]
    bid_qty: String,
    #[serde(rename = "a")]
    ask_price: String,
    #[serde(rename = "A")]
    ask_qty: String,
}

fn parse_decimal(field: &'static str, value: &str) -> Result<f64, ParseError> {
    value.parse::<f64>().map_err(|_| ParseError::Number {
        field,
        value: value.to_string(),
    })
}

/// Parse one WebSocket text frame into a tick. Accepts both the combined
/// envelope and a bare book-ticker payload.
pub fn parse_message(text: &str) -> Result<BookTicker, ParseError> {
    let message = match serde_json::from_str::<CombinedStreamMessage>(text) {
        Ok(combined) => combined.data,
        Err(_) => serde_json::from_str::<BookTickerMessage>(text)?,
    };

    Ok(BookTicker {
        update_id: message.update_id,
        best_bid_price: Price::new(parse_decimal("b", &message.bid_price)?),
        best_bid_qty: Quantity::new(parse_decimal("B", &message.bid_qty)?),
        best_ask_price: Price::new(parse_decimal("a", &message.ask_price)?),
        best_ask_qty: Quantity::new(parse_decimal("A", &message.ask_qty)?),
        symbol: message.symbol,
    })
}

/// Live book-ticker feed over the exchange's combined WebSocket stream.
///
/// Owns a current-thread tokio runtime, so the caller just dedicates an OS
/// thread to `run()`. Reconnection policy is deliberately out of scope: on
/// transport failure `run` returns the error and the supervisor decides.
pub struct BinanceFeed {
    endpoint: String,
    streams: Vec<String>,
    callback: Option<TickerCallback>,
    running: Arc<AtomicBool>,
}

impl BinanceFeed {
    /// `symbols` are exchange symbols (e.g. `BTCUSDT`); each maps to a
    /// `<symbol>@bookTicker` stream.
    pub fn new(symbols: &[String], running: Arc<AtomicBool>) -> Self {
        let streams = symbols
            .iter()
            .map(|symbol| format!("{}@bookTicker", symbol.to_lowercase()))
            .collect();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            streams,
            callback: None,
            running,
        }
    }

    /// Point the feed at a different endpoint (testnets, local mocks).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn stream_loop(&self, callback: &TickerCallback) -> Result<(), MarketDataError> {
        let url = Url::parse(&format!(
            "{}/stream?streams={}",
            self.endpoint,
            self.streams.join("/")
        ))?;
        info!(%url, "connecting to market-data stream");

        let (ws_stream, _) = connect_async(url).await?;
        info!("market-data stream connected");
        let (mut sink, mut stream) = ws_stream.split();

        while self.running.load(Ordering::Acquire) {
            let message = match tokio::time::timeout(POLL_INTERVAL, stream.next()).await {
                Ok(Some(message)) => message?,
                Ok(None) => {
                    warn!("market-data stream closed by peer");
                    return Ok(());
                }
                // Quiet interval; re-check the stop flag.
                Err(_) => continue,
            };

            match message {
                Message::Text(text) => match parse_message(&text) {
                    Ok(ticker) => callback(ticker),
                    Err(err) => warn!(%err, payload = %text, "skipping malformed market-data message"),
                },
                Message::Ping(payload) => {
                    if let Err(err) = sink.send(Message::Pong(payload)).await {
                        error!(%err, "failed to answer ping");
                    }
                }
                Message::Close(frame) => {
                    warn!(?frame, "market-data stream closed");
                    return Ok(());
                }
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {
                    debug!("ignoring non-text frame");
                }
            }
        }

        info!("market-data stream stopping");
        Ok(())
    }
}

impl MarketDataSource for BinanceFeed {
    fn set_callback(&mut self, callback: TickerCallback) {
        self.callback = Some(callback);
    }

    fn run(&mut self) -> Result<(), MarketDataError> {
        let callback = self.callback.clone().ok_or(MarketDataError::NoCallback)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.stream_loop(&callback))
    }
}
