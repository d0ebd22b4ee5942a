use crate::order::{Order, INVALID_ORDER_ID};
use crate::pool::{ObjectPool, SlotId};
use market_core::{ExecType, ExecutionReport, OrderState, Price, Quantity, Side, SymbolId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{info, warn};

/// Default pool capacity: enough live orders for a busy session.
pub const DEFAULT_POOL_CAPACITY: usize = 100_000;

struct Inner {
    pool: ObjectPool<Order>,
    index: HashMap<i64, SlotId>,
    next_order_id: i64,
}

/// Tracks the lifecycle of every order from creation through its execution
/// reports.
///
/// Shared between the strategy thread (creation) and the gateway callback
/// thread (reports). Both paths are short, so one mutex held per operation
/// keeps report application atomic and state transitions linearizable per
/// order id. Terminal states are absorbing: a late or duplicate report
/// against a `Filled`/`Canceled`/`Rejected` order is logged and dropped.
pub struct OrderManager {
    inner: Mutex<Inner>,
}

impl OrderManager {
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pool: ObjectPool::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
                next_order_id: 1,
            }),
        }
    }

    /// Create and register a new order. Returns the assigned id, or
    /// [`INVALID_ORDER_ID`] when the pool is exhausted (the caller must
    /// refuse emission until orders drain).
    pub fn create(&self, symbol_id: SymbolId, side: Side, price: Price, quantity: Quantity) -> i64 {
        let mut inner = self.inner.lock();
        let order_id = inner.next_order_id;
        let order = Order::new(order_id, symbol_id, side, price, quantity);

        match inner.pool.acquire(order) {
            Some(slot) => {
                inner.next_order_id += 1;
                inner.index.insert(order_id, slot);
                order_id
            }
            None => {
                warn!(capacity = inner.pool.capacity(), "order pool exhausted");
                INVALID_ORDER_ID
            }
        }
    }

    /// Read-only snapshot of an order.
    #[inline]
    pub fn get(&self, order_id: i64) -> Option<Order> {
        let inner = self.inner.lock();
        let slot = *inner.index.get(&order_id)?;
        inner.pool.get(slot).copied()
    }

    /// Number of tracked orders (terminal ones included).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one execution report. Unknown ids are logged and ignored;
    /// nothing on this path panics or unwinds.
    pub fn on_execution_report(&self, report: &ExecutionReport) {
        let mut inner = self.inner.lock();
        let Some(&slot) = inner.index.get(&report.order_id) else {
            warn!(order_id = report.order_id, exec_type = %report.exec_type, "execution report for unknown order");
            return;
        };
        let Some(order) = inner.pool.get_mut(slot) else {
            warn!(order_id = report.order_id, "order slot vanished from pool");
            return;
        };

        if order.is_terminal() {
            warn!(
                order_id = order.order_id,
                state = %order.state,
                exec_type = %report.exec_type,
                "report against terminal order ignored"
            );
            return;
        }

        match report.exec_type {
            ExecType::New => {
                order.state = OrderState::New;
                info!(order_id = order.order_id, "order confirmed new");
            }
            ExecType::PartialFill => {
                order.filled_quantity = report.cum_qty.min(order.quantity);
                order.state = OrderState::PartiallyFilled;
                info!(
                    order_id = order.order_id,
                    cum_qty = %report.cum_qty,
                    last_price = %report.last_price,
                    "order partially filled"
                );
            }
            ExecType::Fill => {
                order.filled_quantity = report.cum_qty.min(order.quantity);
                order.state = OrderState::Filled;
                info!(
                    order_id = order.order_id,
                    last_price = %report.last_price,
                    "order filled"
                );
            }
            ExecType::Canceled => {
                order.state = OrderState::Canceled;
                info!(order_id = order.order_id, "order canceled");
            }
            ExecType::Rejected => {
                order.state = OrderState::Rejected;
                warn!(
                    order_id = order.order_id,
                    reason = report.text.as_deref().unwrap_or(""),
                    "order rejected"
                );
            }
            // Pending transitions carry no fill information; just advance the
            // state the exchange reported.
            ExecType::PendingCancel | ExecType::PendingNew => {
                order.state = report.order_state;
            }
        }
    }
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn report(order_id: i64, exec_type: ExecType, state: OrderState, cum_qty: f64) -> ExecutionReport {
        ExecutionReport {
            order_id,
            exec_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            last_qty: Quantity::new(cum_qty),
            last_price: Price::new(100.0),
            leaves_qty: Quantity::ZERO,
            cum_qty: Quantity::new(cum_qty),
            avg_price: Price::new(100.0),
            exec_type,
            order_state: state,
            text: None,
        }
    }

    fn create_order(manager: &OrderManager, qty: f64) -> i64 {
        manager.create(
            SymbolId::from_raw(0),
            Side::Buy,
            Price::new(100.0),
            Quantity::new(qty),
        )
    }

    #[test]
    fn test_create_assigns_monotonic_ids() {
        let manager = OrderManager::new();
        let first = create_order(&manager, 1.0);
        let second = create_order(&manager, 1.0);
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_get_snapshot() {
        let manager = OrderManager::new();
        let id = create_order(&manager, 2.0);
        let order = manager.get(id).unwrap();
        assert_eq!(order.order_id, id);
        assert_eq!(order.quantity, Quantity::new(2.0));
        assert_eq!(order.state, OrderState::New);
        assert!(manager.get(9999).is_none());
    }

    #[test]
    fn test_pool_exhaustion_returns_sentinel() {
        let manager = OrderManager::with_capacity(2);
        assert_eq!(create_order(&manager, 1.0), 1);
        assert_eq!(create_order(&manager, 1.0), 2);
        assert_eq!(create_order(&manager, 1.0), INVALID_ORDER_ID);
        // The failed create must not consume an id.
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_fill_reconciliation_sequence() {
        let manager = OrderManager::new();
        let id = create_order(&manager, 2.0);

        manager.on_execution_report(&report(id, ExecType::PartialFill, OrderState::PartiallyFilled, 1.0));
        let order = manager.get(id).unwrap();
        assert_eq!(order.state, OrderState::PartiallyFilled);
        assert_eq!(order.filled_quantity, Quantity::new(1.0));

        manager.on_execution_report(&report(id, ExecType::Fill, OrderState::Filled, 2.0));
        let order = manager.get(id).unwrap();
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.filled_quantity, Quantity::new(2.0));

        // A further fill for the same id is ignored: terminal is absorbing.
        manager.on_execution_report(&report(id, ExecType::Fill, OrderState::Filled, 2.0));
        assert_eq!(manager.get(id).unwrap().state, OrderState::Filled);
    }

    #[test]
    fn test_terminal_states_absorbing() {
        let manager = OrderManager::new();

        for terminal in [ExecType::Fill, ExecType::Canceled, ExecType::Rejected] {
            let id = create_order(&manager, 1.0);
            manager.on_execution_report(&report(id, terminal, OrderState::Filled, 1.0));
            let settled = manager.get(id).unwrap();
            assert!(settled.is_terminal());

            for follow_up in [
                ExecType::New,
                ExecType::PartialFill,
                ExecType::Fill,
                ExecType::Canceled,
                ExecType::Rejected,
                ExecType::PendingCancel,
                ExecType::PendingNew,
            ] {
                manager.on_execution_report(&report(id, follow_up, OrderState::New, 1.0));
                assert_eq!(manager.get(id).unwrap().state, settled.state);
            }
        }
    }

    #[test]
    fn test_unknown_order_ignored() {
        let manager = OrderManager::new();
        // Must not panic, must not create anything.
        manager.on_execution_report(&report(12345, ExecType::Fill, OrderState::Filled, 1.0));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_pending_transitions_keep_fills() {
        let manager = OrderManager::new();
        let id = create_order(&manager, 2.0);
        manager.on_execution_report(&report(id, ExecType::PartialFill, OrderState::PartiallyFilled, 1.0));

        manager.on_execution_report(&report(id, ExecType::PendingCancel, OrderState::PendingNew, 0.0));
        let order = manager.get(id).unwrap();
        // State advanced, fills untouched.
        assert_eq!(order.state, OrderState::PendingNew);
        assert_eq!(order.filled_quantity, Quantity::new(1.0));
    }

    #[test]
    fn test_cancel_and_reject_paths() {
        let manager = OrderManager::new();

        let canceled = create_order(&manager, 1.0);
        manager.on_execution_report(&report(canceled, ExecType::Canceled, OrderState::Canceled, 0.0));
        assert_eq!(manager.get(canceled).unwrap().state, OrderState::Canceled);

        let rejected = create_order(&manager, 1.0);
        manager.on_execution_report(&report(rejected, ExecType::Rejected, OrderState::Rejected, 0.0));
        assert_eq!(manager.get(rejected).unwrap().state, OrderState::Rejected);

        // Terminal orders stay in the registry for post-session inspection.
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_fill_clamped_to_order_quantity() {
        let manager = OrderManager::new();
        let id = create_order(&manager, 1.0);
        manager.on_execution_report(&report(id, ExecType::Fill, OrderState::Filled, 5.0));
        let order = manager.get(id).unwrap();
        assert_eq!(order.filled_quantity, order.quantity);
    }

    #[test]
    fn test_concurrent_reports_distinct_orders() {
        use std::sync::Arc;
        use std::thread;

        let manager = Arc::new(OrderManager::new());
        let ids: Vec<i64> = (0..64).map(|_| create_order(&manager, 1.0)).collect();

        let handles: Vec<_> = ids
            .chunks(16)
            .map(|chunk| {
                let manager = Arc::clone(&manager);
                let chunk = chunk.to_vec();
                thread::spawn(move || {
                    for id in chunk {
                        manager.on_execution_report(&report(id, ExecType::Fill, OrderState::Filled, 1.0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in ids {
            assert_eq!(manager.get(id).unwrap().state, OrderState::Filled);
        }
    }
}
