use crate::types::{BookTicker, MarketDataError, MarketDataSource, ParseError, TickerCallback};
use market_core::{Price, Quantity};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Replays a CSV tick capture through the normal market-data callback as
/// fast as possible: `timestamp,symbol,bid_price,bid_qty,ask_price,ask_qty`,
/// header row optional. Malformed rows are logged and skipped.
pub struct ReplayFeed {
    path: PathBuf,
    callback: Option<TickerCallback>,
    running: Arc<AtomicBool>,
}

impl ReplayFeed {
    pub fn new(path: impl Into<PathBuf>, running: Arc<AtomicBool>) -> Self {
        Self {
            path: path.into(),
            callback: None,
            running,
        }
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<f64, ParseError> {
    value.trim().parse::<f64>().map_err(|_| ParseError::Number {
        field,
        value: value.to_string(),
    })
}

/// Parse one CSV row. `update_id` is synthesized by the caller since the
/// capture format does not carry one.
pub fn parse_line(line: &str, update_id: i64) -> Result<BookTicker, ParseError> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 6 {
        return Err(ParseError::FieldCount {
            expected: 6,
            got: parts.len(),
        });
    }

    // parts[0] is the capture timestamp; replay ignores it and blasts
    // through at full speed.
    Ok(BookTicker {
        symbol: parts[1].trim().to_string(),
        update_id,
        best_bid_price: Price::new(parse_field("bid_price", parts[2])?),
        best_bid_qty: Quantity::new(parse_field("bid_qty", parts[3])?),
        best_ask_price: Price::new(parse_field("ask_price", parts[4])?),
        best_ask_qty: Quantity::new(parse_field("ask_qty", parts[5])?),
    })
}

impl MarketDataSource for ReplayFeed {
    fn set_callback(&mut self, callback: TickerCallback) {
        self.callback = Some(callback);
    }

    fn run(&mut self) -> Result<(), MarketDataError> {
        let callback = self.callback.clone().ok_or(MarketDataError::NoCallback)?;
        info!(path = %self.path.display(), "loading replay capture");
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut delivered: i64 = 0;
        for (line_no, line) in reader.lines().enumerate() {
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line, delivered) {
                Ok(ticker) => {
                    callback(ticker);
                    delivered += 1;
                }
                Err(err) if line_no == 0 => {
                    debug!(%err, "skipping header row");
                }
                Err(err) => {
                    warn!(%err, row = %line, "skipping malformed replay row");
                }
            }
        }

        info!(ticks = delivered, "replay finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn fixture(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn collect(path: PathBuf) -> Vec<BookTicker> {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let mut feed = ReplayFeed::new(path, Arc::new(AtomicBool::new(true)));
        {
            let ticks = Arc::clone(&ticks);
            feed.set_callback(Arc::new(move |ticker| ticks.lock().push(ticker)));
        }
        feed.run().unwrap();
        let collected = ticks.lock().clone();
        collected
    }

    #[test]
    fn test_parse_line() {
        let ticker = parse_line("1700000000,BTCUSDT,19999.5,1.25,20000.0,0.75", 3).unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.update_id, 3);
        assert_eq!(ticker.best_bid_price, Price::new(19999.5));
        assert_eq!(ticker.best_ask_qty, Quantity::new(0.75));
    }

    #[test]
    fn test_parse_line_rejects_short_rows() {
        assert!(matches!(
            parse_line("1700000000,BTCUSDT,1.0", 0),
            Err(ParseError::FieldCount { got: 3, .. })
        ));
    }

    #[test]
    fn test_replay_with_header_and_bad_rows() {
        let path = fixture(
            "tickcore_replay_test.csv",
            "timestamp,symbol,bid_price,bid_qty,ask_price,ask_qty\n\
             1,BTCUSDT,100.0,1.0,101.0,2.0\n\
             2,BTCUSDT,not_a_price,1.0,101.0,2.0\n\
             \n\
             3,ETHBTC,0.05,5.0,0.0501,4.0\n",
        );

        let ticks = collect(path.clone());
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].symbol, "BTCUSDT");
        assert_eq!(ticks[0].update_id, 0);
        assert_eq!(ticks[1].symbol, "ETHBTC");
        assert_eq!(ticks[1].update_id, 1);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_replay_without_header() {
        let path = fixture(
            "tickcore_replay_noheader_test.csv",
            "1,BTCUSDT,100.0,1.0,101.0,2.0\n2,BTCUSDT,100.5,1.0,101.5,2.0\n",
        );
        let ticks = collect(path.clone());
        // First row parses as data, so nothing is lost to header detection.
        assert_eq!(ticks.len(), 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut feed = ReplayFeed::new(
            std::env::temp_dir().join("tickcore_does_not_exist.csv"),
            Arc::new(AtomicBool::new(true)),
        );
        feed.set_callback(Arc::new(|_| {}));
        assert!(matches!(feed.run(), Err(MarketDataError::Io(_))));
    }
}
