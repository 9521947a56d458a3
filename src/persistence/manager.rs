//! Persistence Manager
//! Mission: Never lose the user collection to a single bad slot
//!
//! Every write lands on the canonical slot first and then on each backup
//! slot independently, best-effort. Reads fall back to the best available
//! backup and repair the canonical slot in passing. Store-level failures
//! degrade to empty results instead of propagating; the guiding rule is
//! "never lose visible user data due to a storage hiccup, even at the
//! cost of silently degraded consistency."

use crate::ledger::models::{UserPatch, UserRecord};
use crate::store::{
    SharedStore, USERS_SLOT, USERS_TIMESTAMP_SLOT, USER_BACKUP_SLOTS,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Owns read/write access to the record store for the user collection.
pub struct PersistenceManager {
    store: SharedStore,
}

impl PersistenceManager {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load the user collection, falling back to the best backup when the
    /// canonical slot is empty or unreadable. On fallback success the
    /// canonical slot is repaired with the recovered data. Never fails:
    /// total loss degrades to an empty collection.
    pub fn load_users(&self) -> Vec<UserRecord> {
        if let Some(users) = self.read_slot_users(USERS_SLOT) {
            if !users.is_empty() {
                return users;
            }
        }

        match self.best_backup_users() {
            Some((slot, users)) => {
                info!(
                    "🛟 Canonical user slot empty or unreadable, recovered {} records from '{}'",
                    users.len(),
                    slot
                );
                self.save_users(&users); // repair canonical + re-sync backups
                users
            }
            None => {
                warn!("Canonical user slot and all backups empty or unreadable, returning empty collection");
                Vec::new()
            }
        }
    }

    /// Write the user collection to the canonical slot and every backup
    /// slot, canonical-first, plus the write timestamp. Each slot write is
    /// independent: one failure never aborts the others.
    pub fn save_users(&self, users: &[UserRecord]) {
        let serialized = match serde_json::to_string(users) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to serialize user collection: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.put(USERS_SLOT, &serialized) {
            error!("Failed to write canonical user slot: {:#}", e);
        }
        for slot in USER_BACKUP_SLOTS {
            if let Err(e) = self.store.put(slot, &serialized) {
                warn!("Failed to write backup slot '{}': {:#}", slot, e);
            }
        }
        if let Err(e) = self
            .store
            .put(USERS_TIMESTAMP_SLOT, &Utc::now().to_rfc3339())
        {
            warn!("Failed to write user timestamp slot: {:#}", e);
        }
    }

    /// Append a record and persist. Duplicate-email checking is the
    /// caller's responsibility.
    pub fn add_user(&self, user: UserRecord) -> Vec<UserRecord> {
        let mut users = self.load_users();
        users.push(user);
        self.save_users(&users);
        users
    }

    /// Shallow-merge `patch` into the record with `user_id`. No matching
    /// record leaves the collection unchanged.
    pub fn update_user(&self, user_id: &str, patch: &UserPatch) -> Vec<UserRecord> {
        let mut users = self.load_users();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            patch.apply(user);
        } else {
            debug!("update_user: no record with id {}, collection unchanged", user_id);
        }
        self.save_users(&users);
        users
    }

    /// Parse one user slot. `None` means missing or structurally invalid.
    pub fn read_slot_users(&self, slot: &str) -> Option<Vec<UserRecord>> {
        let raw = match self.store.get(slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read slot '{}': {:#}", slot, e);
                return None;
            }
        };
        match serde_json::from_str::<Vec<UserRecord>>(&raw) {
            Ok(users) => Some(users),
            Err(e) => {
                warn!("Slot '{}' holds corrupt data: {}", slot, e);
                None
            }
        }
    }

    /// Best-of-N backup selection: the longest valid non-empty backup, in
    /// slot priority order on ties. Canonical excluded.
    pub fn best_backup_users(&self) -> Option<(&'static str, Vec<UserRecord>)> {
        let mut best: Option<(&'static str, Vec<UserRecord>)> = None;
        for slot in USER_BACKUP_SLOTS {
            if let Some(users) = self.read_slot_users(slot) {
                if users.is_empty() {
                    continue;
                }
                let better = match &best {
                    Some((_, current)) => users.len() > current.len(),
                    None => true,
                };
                if better {
                    best = Some((slot, users));
                }
            }
        }
        best
    }

    /// Same selection as the fallback read, but without the canonical
    /// repair side effect. Used by the integrity monitor.
    pub fn best_available_users(&self) -> Vec<UserRecord> {
        if let Some(users) = self.read_slot_users(USERS_SLOT) {
            if !users.is_empty() {
                return users;
            }
        }
        self.best_backup_users()
            .map(|(_, users)| users)
            .unwrap_or_default()
    }

    /// Rewrite every backup slot from `users`, best-effort.
    pub fn sync_backups(&self, users: &[UserRecord]) {
        let serialized = match serde_json::to_string(users) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to serialize users for backup sync: {}", e);
                return;
            }
        };
        for slot in USER_BACKUP_SLOTS {
            if let Err(e) = self.store.put(slot, &serialized) {
                warn!("Failed to sync backup slot '{}': {:#}", slot, e);
            }
        }
    }

    /// Re-write all backups from the canonical slot, healing backups that
    /// drifted (e.g. written outside this manager). Skips the pass when
    /// the canonical slot is unreadable so garbage never clobbers a good
    /// backup.
    pub fn resync_backups_from_canonical(&self) {
        match self.read_slot_users(USERS_SLOT) {
            Some(users) if !users.is_empty() => {
                debug!("Re-syncing {} backup slots from canonical ({} records)",
                    USER_BACKUP_SLOTS.len(), users.len());
                self.sync_backups(&users);
            }
            _ => debug!("Backup re-sync skipped, canonical slot empty or unreadable"),
        }
    }

    /// Recurring backup re-sync, independent of explicit saves.
    pub fn spawn_backup_resync(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                manager.resync_backups_from_canonical();
            }
        })
    }

    // ── Generic collection access (pending/completed slots) ─────────────

    /// Read a serialized collection slot, degrading to empty on any
    /// failure.
    pub fn load_collection<T: DeserializeOwned>(&self, slot: &str) -> Vec<T> {
        let raw = match self.store.get(slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read collection slot '{}': {:#}", slot, e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!("Collection slot '{}' holds corrupt data: {}", slot, e);
                Vec::new()
            }
        }
    }

    /// Write a serialized collection slot, logging and absorbing failures.
    pub fn store_collection<T: Serialize>(&self, slot: &str, items: &[T]) {
        match serde_json::to_string(items) {
            Ok(serialized) => {
                if let Err(e) = self.store.put(slot, &serialized) {
                    error!("Failed to write collection slot '{}': {:#}", slot, e);
                }
            }
            Err(e) => error!("Failed to serialize collection for slot '{}': {}", slot, e),
        }
    }
}
