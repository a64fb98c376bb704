//! Marketplace ledger service.
//!
//! Clients and contractors enter contracts; contracts carry priced jobs. The
//! ledger pays jobs by moving funds between profile balances, accepts capped
//! client deposits and reports on paid work over a date window.

pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use errors::{LedgerError, Result};
pub use services::MarketplaceService;
