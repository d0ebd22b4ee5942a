//! Pure signal math, kept separate from the engine so it can be reasoned
//! about (and tested) without any book or threading machinery.

/// Profit in quote units from cycling 100 USDT through the triangle
/// USDT -> BTC -> ETH -> USDT:
///
/// buy BTC at `btc_usdt_ask`, convert to ETH at `eth_btc_ask`, sell the ETH
/// at `eth_usdt_bid`. All inputs must be positive.
#[inline]
pub fn triangular_profit(btc_usdt_ask: f64, eth_btc_ask: f64, eth_usdt_bid: f64) -> f64 {
    const STAKE_USDT: f64 = 100.0;
    let btc = STAKE_USDT / btc_usdt_ask;
    let eth = btc / eth_btc_ask;
    eth * eth_usdt_bid - STAKE_USDT
}

/// Order-book imbalance `(bid_qty - ask_qty) / (bid_qty + ask_qty)`,
/// in [-1, +1]: +1 is pure buy pressure, -1 pure sell pressure.
/// `None` when the touch is empty.
#[inline]
pub fn imbalance(bid_qty: f64, ask_qty: f64) -> Option<f64> {
    let total = bid_qty + ask_qty;
    if total <= 0.0 {
        return None;
    }
    Some((bid_qty - ask_qty) / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangular_profit_known_cycle() {
        // 100 / 20000 = 0.005 BTC; / 0.05 = 0.1 ETH; * 1010 = 101 USDT.
        let profit = triangular_profit(20000.0, 0.05, 1010.0);
        assert!((profit - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangular_profit_negative_cycle() {
        let profit = triangular_profit(20000.0, 0.05, 990.0);
        assert!(profit < 0.0);
    }

    #[test]
    fn test_imbalance_range() {
        assert_eq!(imbalance(10.0, 0.0), Some(1.0));
        assert_eq!(imbalance(0.0, 10.0), Some(-1.0));
        assert_eq!(imbalance(5.0, 5.0), Some(0.0));
        let skewed = imbalance(10.0, 1.0).unwrap();
        assert!(skewed > 0.8 && skewed < 1.0);
    }

    #[test]
    fn test_imbalance_empty_touch() {
        assert_eq!(imbalance(0.0, 0.0), None);
    }
}
