//! Asynchronous order-entry gateway. The simulation stands in for an
//! exchange session: orders go out without blocking and execution reports
//! come back on a dispatcher thread after a realistic round-trip delay.

pub mod gateway;

pub use gateway::{ExecCallback, GatewayConfig, SimulatedGateway};
