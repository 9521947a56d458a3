//! Record Store
//!
//! Named-slot key-value persistence underlying every collection in the
//! subsystem. One shared handle is injected into all writers so they
//! serialize through a single owner instead of racing on a global.
//!
//! RULE: Only the persistence manager (and the integrity monitor, for its
//! own counter and the backup slots) touch these slots. Business code
//! never calls the store directly.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use std::sync::Arc;

/// Canonical user collection.
pub const USERS_SLOT: &str = "users";
/// Redundant user snapshots, in fallback priority order.
pub const USER_BACKUP_SLOTS: [&str; 3] = ["users_backup", "users_backup_2", "users_backup_3"];
/// Last successful user-collection write time (RFC 3339).
pub const USERS_TIMESTAMP_SLOT: &str = "users_timestamp";
/// Integrity monitor state, persisted so it survives restarts.
pub const LAST_KNOWN_USER_COUNT_SLOT: &str = "last_known_user_count";
/// Pending financial transactions awaiting admin action.
pub const PENDING_TRANSACTIONS_SLOT: &str = "pendingTransactions";
/// Append-only completed/rejected transaction log.
pub const TRANSACTIONS_SLOT: &str = "transactions";
/// Pending identity-verification requests.
pub const PENDING_KYC_SLOT: &str = "pendingKYC";

/// Durable named-slot storage. All operations are synchronous from the
/// caller's perspective; implementations use interior mutability so the
/// handle can be shared freely.
pub trait RecordStore: Send + Sync {
    /// Read a slot. `Ok(None)` means the slot was never written.
    fn get(&self, slot: &str) -> Result<Option<String>>;

    /// Write a slot, replacing any previous value.
    fn put(&self, slot: &str, value: &str) -> Result<()>;

    /// Delete a slot. Removing an absent slot is not an error.
    fn remove(&self, slot: &str) -> Result<()>;
}

/// Shared store handle passed to every component.
pub type SharedStore = Arc<dyn RecordStore>;
