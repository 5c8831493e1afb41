//! Business services: the order ledger and the stock guard.

pub mod orders;
pub mod stock;

pub use orders::{OrderLedger, Reconciliation};
pub use stock::{StockCheckResult, StockGuard};
