use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use market_core::{ExecType, ExecutionReport, OrderState, OrderType, Price, Quantity, Side};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handler invoked with every execution report. Runs on the gateway
/// dispatcher thread, never on the sender's.
pub type ExecCallback = Arc<dyn Fn(ExecutionReport) + Send + Sync>;

/// Simulated exchange round-trip bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 5,
            max_delay_ms: 50,
        }
    }
}

enum Command {
    Send(SendRequest),
    Cancel { order_id: i64 },
}

struct SendRequest {
    symbol: String,
    side: Side,
    price: Price,
    quantity: Quantity,
    order_type: OrderType,
    order_id: i64,
}

enum EventKind {
    Fill,
    Cancel,
}

/// An execution report scheduled for a future instant. Ordered by due time,
/// sequence number breaking ties so same-instant events keep submit order.
struct PendingEvent {
    due: Instant,
    seq: u64,
    order_id: i64,
    kind: EventKind,
}

impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for PendingEvent {}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then_with(|| self.seq.cmp(&other.seq))
    }
}

struct InFlight {
    symbol: String,
    side: Side,
    price: Price,
    quantity: Quantity,
}

/// Order-entry gateway simulating an exchange session.
///
/// `send` and `cancel` enqueue a command and return immediately; a single
/// dispatcher thread owns the simulated exchange state, applies a uniformly
/// distributed 5-50 ms round-trip delay per request, and fires the
/// execution callback exactly once per accepted order. The callback thread
/// is therefore always distinct from the strategy thread.
///
/// A real session would emit `PendingNew -> New -> PartialFill* -> Fill`
/// chains and survive reconnects; the simulation jumps straight to the fill.
pub struct SimulatedGateway {
    commands: Option<Sender<Command>>,
    callback_slot: Arc<RwLock<Option<ExecCallback>>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl SimulatedGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let (commands, receiver) = unbounded();
        let callback_slot: Arc<RwLock<Option<ExecCallback>>> = Arc::new(RwLock::new(None));
        let dispatcher = {
            let callback_slot = Arc::clone(&callback_slot);
            thread::Builder::new()
                .name("gateway-sim".to_string())
                .spawn(move || dispatcher_loop(receiver, callback_slot, config))
                .expect("failed to spawn gateway dispatcher")
        };
        Self {
            commands: Some(commands),
            callback_slot,
            dispatcher: Some(dispatcher),
        }
    }

    /// Register the handler for execution reports. Replaces any previous
    /// handler; reports fired before registration are dropped with a warning.
    pub fn set_execution_callback(&self, callback: ExecCallback) {
        *self.callback_slot.write() = Some(callback);
    }

    #[inline]
    fn send_command(&self, command: Command) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(command);
        }
    }

    /// New order single. Non-blocking; the fill report arrives via the
    /// callback after the simulated round trip.
    pub fn send(
        &self,
        symbol: &str,
        side: Side,
        price: Price,
        quantity: Quantity,
        order_type: OrderType,
        order_id: i64,
    ) {
        debug!(order_id, %side, %price, %quantity, %order_type, symbol, "gateway send");
        self.send_command(Command::Send(SendRequest {
            symbol: symbol.to_string(),
            side,
            price,
            quantity,
            order_type,
            order_id,
        }));
    }

    /// Cancel request. If the order is still in flight a `Canceled` report
    /// comes back after the simulated round trip; if it was already filled
    /// the cancel is too late and is dropped with a warning.
    pub fn cancel(&self, order_id: i64) {
        debug!(order_id, "gateway cancel");
        self.send_command(Command::Cancel { order_id });
    }
}

impl Drop for SimulatedGateway {
    fn drop(&mut self) {
        // Closing the channel stops the dispatcher once its heap drains.
        self.commands.take();
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
    }
}

fn dispatcher_loop(
    receiver: Receiver<Command>,
    callback: Arc<RwLock<Option<ExecCallback>>>,
    config: GatewayConfig,
) {
    let mut rng = rand::thread_rng();
    let mut pending: BinaryHeap<Reverse<PendingEvent>> = BinaryHeap::new();
    let mut in_flight: HashMap<i64, InFlight> = HashMap::new();
    let mut seq: u64 = 0;
    let mut disconnected = false;

    loop {
        let now = Instant::now();

        // Fire everything due.
        while pending.peek().is_some_and(|Reverse(event)| event.due <= now) {
            if let Some(Reverse(event)) = pending.pop() {
                fire(event, &mut in_flight, &callback);
            }
        }

        let timeout = pending
            .peek()
            .map(|Reverse(event)| event.due.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(100));

        if disconnected {
            if pending.is_empty() {
                break;
            }
            thread::sleep(timeout);
            continue;
        }

        match receiver.recv_timeout(timeout) {
            Ok(Command::Send(request)) => {
                let delay = rng.gen_range(config.min_delay_ms..=config.max_delay_ms);
                seq += 1;
                in_flight.insert(
                    request.order_id,
                    InFlight {
                        symbol: request.symbol,
                        side: request.side,
                        price: request.price,
                        quantity: request.quantity,
                    },
                );
                pending.push(Reverse(PendingEvent {
                    due: Instant::now() + Duration::from_millis(delay),
                    seq,
                    order_id: request.order_id,
                    kind: EventKind::Fill,
                }));
            }
            Ok(Command::Cancel { order_id }) => {
                if !in_flight.contains_key(&order_id) {
                    warn!(order_id, "cancel for unknown or completed order");
                    continue;
                }
                let delay = rng.gen_range(config.min_delay_ms..=config.max_delay_ms);
                seq += 1;
                pending.push(Reverse(PendingEvent {
                    due: Instant::now() + Duration::from_millis(delay),
                    seq,
                    order_id,
                    kind: EventKind::Cancel,
                }));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                disconnected = true;
            }
        }
    }

    if !in_flight.is_empty() {
        info!(open = in_flight.len(), "gateway shut down with orders in flight");
    }
}

fn fire(
    event: PendingEvent,
    in_flight: &mut HashMap<i64, InFlight>,
    callback: &Arc<RwLock<Option<ExecCallback>>>,
) {
    // An order leaves the in-flight set on its first terminal event; the
    // loser of a fill/cancel race finds nothing and does nothing.
    let Some(order) = in_flight.remove(&event.order_id) else {
        return;
    };

    let report = match event.kind {
        EventKind::Fill => ExecutionReport {
            order_id: event.order_id,
            exec_id: Uuid::new_v4(),
            symbol: order.symbol,
            side: order.side,
            last_qty: order.quantity,
            last_price: order.price,
            leaves_qty: Quantity::ZERO,
            cum_qty: order.quantity,
            avg_price: order.price,
            exec_type: ExecType::Fill,
            order_state: OrderState::Filled,
            text: Some("simulated fill".to_string()),
        },
        EventKind::Cancel => ExecutionReport {
            order_id: event.order_id,
            exec_id: Uuid::new_v4(),
            symbol: order.symbol,
            side: order.side,
            last_qty: Quantity::ZERO,
            last_price: Price::ZERO,
            leaves_qty: order.quantity,
            cum_qty: Quantity::ZERO,
            avg_price: Price::ZERO,
            exec_type: ExecType::Canceled,
            order_state: OrderState::Canceled,
            text: Some("canceled by request".to_string()),
        },
    };

    let guard = callback.read();
    match guard.as_ref() {
        Some(cb) => cb(report),
        None => warn!(order_id = report.order_id, "execution report dropped: no callback registered"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread::ThreadId;

    fn fast_config() -> GatewayConfig {
        GatewayConfig {
            min_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    fn collect_reports(gateway: &SimulatedGateway) -> mpsc::Receiver<(ExecutionReport, ThreadId)> {
        let (tx, rx) = mpsc::channel();
        gateway.set_execution_callback(Arc::new(move |report| {
            let _ = tx.send((report, thread::current().id()));
        }));
        rx
    }

    #[test]
    fn test_send_fills_exactly_once() {
        let gateway = SimulatedGateway::new(fast_config());
        let reports = collect_reports(&gateway);

        gateway.send(
            "BTCUSDT",
            Side::Buy,
            Price::new(20000.0),
            Quantity::new(0.001),
            OrderType::Market,
            1,
        );

        let (report, _) = reports.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(report.order_id, 1);
        assert_eq!(report.exec_type, ExecType::Fill);
        assert_eq!(report.order_state, OrderState::Filled);
        assert_eq!(report.cum_qty, Quantity::new(0.001));
        assert_eq!(report.last_price, Price::new(20000.0));
        assert_eq!(report.leaves_qty, Quantity::ZERO);
        assert_eq!(report.symbol, "BTCUSDT");

        // Exactly once.
        assert!(reports.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_callback_runs_off_caller_thread() {
        let gateway = SimulatedGateway::new(fast_config());
        let reports = collect_reports(&gateway);

        gateway.send(
            "BTCUSDT",
            Side::Sell,
            Price::new(100.0),
            Quantity::new(1.0),
            OrderType::Limit,
            7,
        );

        let (_, callback_thread) = reports.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_ne!(callback_thread, thread::current().id());
    }

    #[test]
    fn test_send_returns_before_fill() {
        let gateway = SimulatedGateway::new(GatewayConfig {
            min_delay_ms: 40,
            max_delay_ms: 50,
        });
        let reports = collect_reports(&gateway);

        let before = Instant::now();
        gateway.send(
            "BTCUSDT",
            Side::Buy,
            Price::new(100.0),
            Quantity::new(1.0),
            OrderType::Market,
            1,
        );
        assert!(before.elapsed() < Duration::from_millis(20), "send must not block");

        let (report, _) = reports.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(before.elapsed() >= Duration::from_millis(40), "fill arrives after the simulated delay");
        assert_eq!(report.exec_type, ExecType::Fill);
    }

    #[test]
    fn test_every_send_gets_a_fill() {
        let gateway = SimulatedGateway::new(fast_config());
        let reports = collect_reports(&gateway);

        for order_id in 1..=20 {
            gateway.send(
                "ETHUSDT",
                Side::Buy,
                Price::new(1000.0),
                Quantity::new(0.01),
                OrderType::Market,
                order_id,
            );
        }

        let mut seen = std::collections::HashSet::new();
        for _ in 0..20 {
            let (report, _) = reports.recv_timeout(Duration::from_secs(1)).unwrap();
            assert!(seen.insert(report.order_id), "duplicate report");
        }
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn test_cancel_unknown_order_is_silent() {
        let gateway = SimulatedGateway::new(fast_config());
        let reports = collect_reports(&gateway);

        gateway.cancel(999);
        assert!(reports.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_fill_and_cancel_race_yields_one_terminal_report() {
        let gateway = SimulatedGateway::new(fast_config());
        let reports = collect_reports(&gateway);

        gateway.send(
            "BTCUSDT",
            Side::Buy,
            Price::new(100.0),
            Quantity::new(1.0),
            OrderType::Limit,
            3,
        );
        gateway.cancel(3);

        let (first, _) = reports.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(first.exec_type, ExecType::Fill | ExecType::Canceled));
        // The race loser must not produce a second report.
        assert!(reports.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn test_drop_joins_dispatcher() {
        let gateway = SimulatedGateway::new(fast_config());
        let reports = collect_reports(&gateway);
        gateway.send(
            "BTCUSDT",
            Side::Buy,
            Price::new(100.0),
            Quantity::new(1.0),
            OrderType::Market,
            1,
        );
        drop(gateway);
        // Pending fill is still delivered before shutdown completes.
        assert!(reports.recv_timeout(Duration::from_millis(10)).is_ok());
    }
}
