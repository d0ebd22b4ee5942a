//! Market-data ingress. The core consumes a stream of [`BookTicker`]
//! messages; where they come from (live exchange WebSocket or a CSV
//! capture) is hidden behind [`MarketDataSource`].

pub mod binance;
pub mod replay;
pub mod types;

pub use binance::BinanceFeed;
pub use replay::ReplayFeed;
pub use types::{BookTicker, MarketDataError, MarketDataSource, ParseError, TickerCallback};
