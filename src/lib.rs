//! TradeSim Ledger
//!
//! Client-resident ledger persistence and integrity-recovery subsystem of
//! the TradeSim trading-simulation application: durable multi-copy storage
//! of user account records, periodic integrity monitoring with automatic
//! recovery from backup, and the pending-transaction / KYC approval state
//! machine that mutates account balances.

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod monitor;
pub mod persistence;
pub mod store;

pub use config::Config;
pub use error::LedgerError;
pub use events::LedgerEvent;
pub use ledger::Ledger;
pub use monitor::IntegrityMonitor;
pub use persistence::PersistenceManager;
