//! Persistence Layer
//!
//! Owns the physical read/write path to the record store: canonical-first
//! multi-copy writes, best-of-N fallback reads, and the periodic backup
//! re-sync task.

pub mod manager;

pub use manager::PersistenceManager;
