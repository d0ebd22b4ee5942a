use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use uuid::Uuid;

use fixed::{FixedI64, FixedU64};

/// Signed fixed-point with 32 fractional bits. Covers prices up to ~2.1e9
/// with sub-nanounit resolution, enough for crypto quantities like 0.001.
pub type PriceFixed = FixedI64<typenum::U32>;
pub type QuantityFixed = FixedU64<typenum::U32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Price(PriceFixed);

// Prices serialize as plain decimals so configs and captures stay readable;
// the fixed-point representation is an internal concern.
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Price::new)
    }
}

impl Price {
    pub const ZERO: Self = Self(PriceFixed::ZERO);
    pub const MAX: Self = Self(PriceFixed::MAX);

    #[inline]
    pub fn new(value: f64) -> Self {
        Self(PriceFixed::from_num(value))
    }

    #[inline]
    pub fn from_raw(raw: i64) -> Self {
        Self(PriceFixed::from_bits(raw))
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0.to_num()
    }

    #[inline]
    pub fn to_raw(self) -> i64 {
        self.0.to_bits()
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == PriceFixed::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_f64())
    }
}

impl PartialOrd for Price {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Price {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Price {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * PriceFixed::from_num(rhs))
    }
}

impl Div<f64> for Price {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / PriceFixed::from_num(rhs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Quantity(QuantityFixed);

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Quantity::new)
    }
}

impl Quantity {
    pub const ZERO: Self = Self(QuantityFixed::ZERO);
    pub const MAX: Self = Self(QuantityFixed::MAX);

    #[inline]
    pub fn new(value: f64) -> Self {
        Self(QuantityFixed::from_num(value))
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(QuantityFixed::from_bits(raw))
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0.to_num()
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0.to_bits()
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == QuantityFixed::ZERO
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_f64())
    }
}

impl PartialOrd for Quantity {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Quantity {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline]
    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    Limit = 0,
    Market = 1,
    Ioc = 2,
    Fok = 3,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Ioc => write!(f, "IOC"),
            OrderType::Fok => write!(f, "FOK"),
        }
    }
}

/// Order lifecycle states. `Filled`, `Canceled` and `Rejected` are terminal:
/// no execution report may move an order out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderState {
    PendingNew = 0,
    New = 1,
    PartiallyFilled = 2,
    Filled = 3,
    Canceled = 4,
    Rejected = 5,
}

impl OrderState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Rejected
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::PendingNew => write!(f, "PENDING_NEW"),
            OrderState::New => write!(f, "NEW"),
            OrderState::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderState::Filled => write!(f, "FILLED"),
            OrderState::Canceled => write!(f, "CANCELED"),
            OrderState::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// FIX-style execution types carried by an `ExecutionReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecType {
    New = 0,
    PartialFill = 1,
    Fill = 2,
    Canceled = 3,
    Rejected = 4,
    PendingCancel = 5,
    PendingNew = 6,
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecType::New => write!(f, "NEW"),
            ExecType::PartialFill => write!(f, "PARTIAL_FILL"),
            ExecType::Fill => write!(f, "FILL"),
            ExecType::Canceled => write!(f, "CANCELED"),
            ExecType::Rejected => write!(f, "REJECTED"),
            ExecType::PendingCancel => write!(f, "PENDING_CANCEL"),
            ExecType::PendingNew => write!(f, "PENDING_NEW"),
        }
    }
}

/// Exchange acknowledgment or fill notification for a prior order
/// (FIX msgType=8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: i64,
    /// Exchange-assigned execution id.
    pub exec_id: Uuid,
    pub symbol: String,
    pub side: Side,
    /// Quantity filled in this specific execution.
    pub last_qty: Quantity,
    /// Price of this specific fill.
    pub last_price: Price,
    /// Quantity remaining to be filled.
    pub leaves_qty: Quantity,
    /// Cumulative quantity filled so far.
    pub cum_qty: Quantity,
    /// Volume-weighted average fill price so far.
    pub avg_price: Price,
    pub exec_type: ExecType,
    pub order_state: OrderState,
    /// Optional free text (e.g. rejection reason).
    pub text: Option<String>,
}
