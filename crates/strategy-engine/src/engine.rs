use crate::signals;
use latency_profiler::LatencyHistogram;
use market_core::{ExecutionLog, OrderType, Price, Quantity, Side, SymbolId, SymbolInterner};
use market_data::BookTicker;
use order_book::OrderBook;
use order_gateway::SimulatedGateway;
use order_manager::{OrderManager, INVALID_ORDER_ID};
use risk_gate::RiskGate;
use serde::{Deserialize, Serialize};
use spsc_queue::SpscQueue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Signal parameters. The defaults mirror the production triangle
/// (USDT -> BTC -> ETH -> USDT) with conservative demo sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Triangle leg 1 pair; also the imbalance target.
    pub base_symbol: String,
    /// Triangle leg 2 pair.
    pub cross_symbol: String,
    /// Triangle leg 3 pair.
    pub quote_symbol: String,
    /// Minimum cycle profit (quote units per 100 staked) to act on.
    pub arb_profit_threshold: f64,
    pub arb_order_qty: f64,
    /// Minimum top-of-book imbalance to act on.
    pub imbalance_threshold: f64,
    pub imbalance_order_qty: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_symbol: "BTCUSDT".to_string(),
            cross_symbol: "ETHBTC".to_string(),
            quote_symbol: "ETHUSDT".to_string(),
            arb_profit_threshold: 0.30,
            arb_order_qty: 0.001,
            imbalance_threshold: 0.8,
            imbalance_order_qty: 0.01,
        }
    }
}

/// The strategy thread's world: per-symbol books, the tick-to-decision
/// histogram and the order emission path.
///
/// Everything here is single-threaded by construction; the only shared
/// touch points are the SPSC queue it consumes, the order manager / gateway
/// it hands orders to, and the `running` flag the supervisor flips.
pub struct StrategyEngine {
    config: StrategyConfig,
    interner: Arc<SymbolInterner>,
    books: HashMap<SymbolId, OrderBook>,
    base_id: SymbolId,
    cross_id: SymbolId,
    quote_id: SymbolId,
    gateway: Arc<SimulatedGateway>,
    orders: Arc<OrderManager>,
    risk: RiskGate,
    histogram: LatencyHistogram,
    running: Arc<AtomicBool>,
    journal: Option<Arc<ExecutionLog>>,
}

impl StrategyEngine {
    pub fn new(
        config: StrategyConfig,
        interner: Arc<SymbolInterner>,
        gateway: Arc<SimulatedGateway>,
        orders: Arc<OrderManager>,
        risk: RiskGate,
        running: Arc<AtomicBool>,
    ) -> Self {
        // Pre-register the triangle so the hot path only ever reads.
        let base_id = interner.intern(&config.base_symbol);
        let cross_id = interner.intern(&config.cross_symbol);
        let quote_id = interner.intern(&config.quote_symbol);

        let mut books = HashMap::new();
        books.insert(base_id, OrderBook::new(config.base_symbol.clone()));
        books.insert(cross_id, OrderBook::new(config.cross_symbol.clone()));
        books.insert(quote_id, OrderBook::new(config.quote_symbol.clone()));

        Self {
            config,
            interner,
            books,
            base_id,
            cross_id,
            quote_id,
            gateway,
            orders,
            risk,
            histogram: LatencyHistogram::new("strategy::on_tick"),
            running,
            journal: None,
        }
    }

    /// Attach the execution journal.
    pub fn with_journal(mut self, journal: Arc<ExecutionLog>) -> Self {
        self.journal = Some(journal);
        self
    }

    #[inline]
    pub fn histogram(&self) -> &LatencyHistogram {
        &self.histogram
    }

    /// Net position in signed base units, for telemetry.
    #[inline]
    pub fn position(&self) -> f64 {
        self.risk.position()
    }

    /// Consume ticks until the supervisor clears the running flag, then
    /// drain what is left and report latencies.
    ///
    /// Spins while the queue yields data; on empty it yields the CPU (a
    /// production build pinned to an isolated core would busy-spin instead).
    pub fn run(&mut self, queue: &SpscQueue<BookTicker>) {
        info!("strategy engine started");
        while self.running.load(Ordering::Acquire) {
            while let Some(ticker) = queue.pop() {
                self.histogram.start();
                self.on_tick(&ticker);
                self.histogram.stop();
            }
            thread::yield_now();
        }
        while let Some(ticker) = queue.pop() {
            self.histogram.start();
            self.on_tick(&ticker);
            self.histogram.stop();
        }
        info!("strategy engine stopped");
        self.histogram.log_report();
    }

    /// The per-tick hot path: book update, then both signals. Budget is
    /// well under a microsecond, so nothing here blocks or allocates beyond
    /// an actual order emission.
    pub fn on_tick(&mut self, ticker: &BookTicker) {
        let symbol_id = self.interner.intern(&ticker.symbol);
        let Some(book) = self.books.get_mut(&symbol_id) else {
            // Not a pair this strategy trades.
            return;
        };
        book.update_bid(ticker.best_bid_price, ticker.best_bid_qty);
        book.update_ask(ticker.best_ask_price, ticker.best_ask_qty);

        self.check_triangular();
        self.check_imbalance(symbol_id);
    }

    /// Triangular arbitrage across base/cross/quote. Emits leg 1 only; the
    /// remaining legs would hedge the cycle out.
    fn check_triangular(&mut self) {
        let btc_usdt_ask = self.best_ask(self.base_id);
        let eth_btc_ask = self.best_ask(self.cross_id);
        let eth_usdt_bid = self.best_bid(self.quote_id);

        if btc_usdt_ask.is_zero() || eth_btc_ask.is_zero() || eth_usdt_bid.is_zero() {
            return;
        }

        let profit = signals::triangular_profit(
            btc_usdt_ask.to_f64(),
            eth_btc_ask.to_f64(),
            eth_usdt_bid.to_f64(),
        );
        if profit <= self.config.arb_profit_threshold {
            return;
        }

        info!(profit, "arbitrage cycle detected");
        self.journal(&format!(
            "arbitrage opportunity: profit {:.4} per 100 staked ({} / {} / {})",
            profit, btc_usdt_ask, eth_btc_ask, eth_usdt_bid
        ));

        let qty = Quantity::new(self.config.arb_order_qty);
        self.emit_order(self.base_id, Side::Buy, btc_usdt_ask, qty, btc_usdt_ask);
    }

    /// Top-of-book imbalance on the target pair: heavy resting bids against
    /// thin asks implies short-term upward pressure, so cross the spread.
    fn check_imbalance(&mut self, symbol_id: SymbolId) {
        if symbol_id != self.base_id {
            return;
        }
        let Some(book) = self.books.get(&symbol_id) else {
            return;
        };
        let Some(imbalance) =
            signals::imbalance(book.best_bid_qty().to_f64(), book.best_ask_qty().to_f64())
        else {
            return;
        };
        if imbalance <= self.config.imbalance_threshold {
            return;
        }

        let best_ask = book.best_ask();
        if best_ask.is_zero() {
            return;
        }

        info!(imbalance, "imbalance signal on target pair");
        self.journal(&format!(
            "imbalance signal {:.3}: crossing buy {} @ {}",
            imbalance, self.config.imbalance_order_qty, best_ask
        ));

        let qty = Quantity::new(self.config.imbalance_order_qty);
        self.emit_order(symbol_id, Side::Buy, best_ask, qty, best_ask);
    }

    /// Emission sequence for an approved candidate:
    /// risk check -> create in the OMS -> hand to the gateway -> count the
    /// exposure. Rejections and pool exhaustion are logged and skipped;
    /// nothing unwinds through the hot path.
    fn emit_order(
        &mut self,
        symbol_id: SymbolId,
        side: Side,
        price: Price,
        quantity: Quantity,
        reference_price: Price,
    ) {
        if let Err(rejection) = self.risk.check(symbol_id, side, price, quantity, reference_price)
        {
            self.journal(&format!("risk rejected {} {}: {}", side, quantity, rejection));
            return;
        }

        let order_id = self.orders.create(symbol_id, side, price, quantity);
        if order_id == INVALID_ORDER_ID {
            warn!("order pool exhausted; refusing emission until drain");
            return;
        }

        let symbol = self.interner.name_of(symbol_id);
        self.gateway
            .send(&symbol, side, price, quantity, OrderType::Market, order_id);
        self.risk.update_position(side, quantity);

        self.journal(&format!(
            "sent order {}: {} {} {} @ {}",
            order_id, side, quantity, symbol, price
        ));
    }

    #[inline]
    fn best_ask(&self, symbol_id: SymbolId) -> Price {
        self.books
            .get(&symbol_id)
            .map(|book| book.best_ask())
            .unwrap_or(Price::ZERO)
    }

    #[inline]
    fn best_bid(&self, symbol_id: SymbolId) -> Price {
        self.books
            .get(&symbol_id)
            .map(|book| book.best_bid())
            .unwrap_or(Price::ZERO)
    }

    #[inline]
    fn journal(&self, message: &str) {
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.log(message) {
                warn!(%err, "execution journal write failed");
            }
        }
    }
}
