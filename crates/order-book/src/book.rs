use market_core::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One price level: `(price, quantity)`. A quantity of zero means the level
/// is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
}

/// Per-symbol ladder of bid and ask levels, fed by top-of-book updates.
///
/// Both sides are ordered maps keyed by price; best bid is the highest key,
/// best ask the lowest. A transiently crossed book (bid >= ask) is tolerated
/// and never acted upon here. A production variant could swap the maps for
/// flat tick-indexed arrays without changing this contract.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    symbol: String,
    bids: BTreeMap<Price, Quantity>,
    asks: BTreeMap<Price, Quantity>,
}

impl OrderBook {
    #[inline]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Insert, overwrite or (on zero quantity) remove a bid level.
    #[inline]
    pub fn update_bid(&mut self, price: Price, quantity: Quantity) {
        if quantity.is_zero() {
            self.bids.remove(&price);
        } else {
            self.bids.insert(price, quantity);
        }
    }

    /// Insert, overwrite or (on zero quantity) remove an ask level.
    #[inline]
    pub fn update_ask(&mut self, price: Price, quantity: Quantity) {
        if quantity.is_zero() {
            self.asks.remove(&price);
        } else {
            self.asks.insert(price, quantity);
        }
    }

    /// Highest bid price; `Price::ZERO` when the side is empty.
    #[inline]
    pub fn best_bid(&self) -> Price {
        self.bids
            .last_key_value()
            .map(|(price, _)| *price)
            .unwrap_or(Price::ZERO)
    }

    /// Lowest ask price; `Price::ZERO` when the side is empty.
    #[inline]
    pub fn best_ask(&self) -> Price {
        self.asks
            .first_key_value()
            .map(|(price, _)| *price)
            .unwrap_or(Price::ZERO)
    }

    /// Quantity resting at the best bid; zero when the side is empty.
    #[inline]
    pub fn best_bid_qty(&self) -> Quantity {
        self.bids
            .last_key_value()
            .map(|(_, qty)| *qty)
            .unwrap_or(Quantity::ZERO)
    }

    /// Quantity resting at the best ask; zero when the side is empty.
    #[inline]
    pub fn best_ask_qty(&self) -> Quantity {
        self.asks
            .first_key_value()
            .map(|(_, qty)| *qty)
            .unwrap_or(Quantity::ZERO)
    }

    /// Midpoint of the touch; `Price::ZERO` when either side is empty.
    #[inline]
    pub fn mid_price(&self) -> Price {
        let bid = self.best_bid();
        let ask = self.best_ask();
        if bid.is_zero() || ask.is_zero() {
            return Price::ZERO;
        }
        (bid + ask) / 2.0
    }

    #[inline]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    /// Snapshot of the top `depth` levels: bids best-first (descending),
    /// asks best-first (ascending).
    pub fn top_levels(&self, depth: usize) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(&price, &quantity)| PriceLevel { price, quantity })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(&price, &quantity)| PriceLevel { price, quantity })
            .collect();
        (bids, asks)
    }

    /// Log the top `depth` levels of both sides.
    pub fn print_top(&self, depth: usize) {
        let (bids, asks) = self.top_levels(depth);
        info!(symbol = %self.symbol, "order book");
        for level in asks.iter().rev() {
            info!("  ASK {} x {}", level.price, level.quantity);
        }
        info!("  ----------------");
        for level in &bids {
            info!("  BID {} x {}", level.price, level.quantity);
        }
    }
}
