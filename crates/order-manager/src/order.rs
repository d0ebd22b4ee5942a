use market_core::{OrderState, Price, Quantity, Side, SymbolId};
use serde::{Deserialize, Serialize};

/// Sentinel returned by [`crate::OrderManager::create`] when the order pool
/// is exhausted.
pub const INVALID_ORDER_ID: i64 = -1;

/// A single tracked order. Lives in the order pool for the whole session;
/// terminal orders are kept for post-trade inspection rather than recycled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub symbol_id: SymbolId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub state: OrderState,
}

impl Order {
    #[inline]
    pub fn new(order_id: i64, symbol_id: SymbolId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            order_id,
            symbol_id,
            side,
            price,
            quantity,
            filled_quantity: Quantity::ZERO,
            state: OrderState::New,
        }
    }

    #[inline]
    pub fn leaves_quantity(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_defaults() {
        let order = Order::new(
            7,
            SymbolId::from_raw(0),
            Side::Buy,
            Price::new(100.0),
            Quantity::new(2.0),
        );
        assert_eq!(order.state, OrderState::New);
        assert_eq!(order.filled_quantity, Quantity::ZERO);
        assert_eq!(order.leaves_quantity(), Quantity::new(2.0));
        assert!(!order.is_terminal());
    }
}
