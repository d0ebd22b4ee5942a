//! Shared market types for the execution core: fixed-point price and
//! quantity, order/side/state enums, execution reports, symbol interning and
//! the execution journal.

pub mod exec_log;
pub mod symbols;
pub mod types;

pub use exec_log::ExecutionLog;
pub use symbols::{SymbolId, SymbolInterner, UNKNOWN_SYMBOL};
pub use types::{
    ExecType, ExecutionReport, OrderState, OrderType, Price, PriceFixed, Quantity, QuantityFixed,
    Side,
};
