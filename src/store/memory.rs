//! In-Memory Record Store
//! Mission: Fast ephemeral slot storage for tests and single-run sessions

use super::RecordStore;
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// HashMap-backed store behind a `parking_lot` lock.
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of populated slots (diagnostics only).
    pub fn slot_count(&self) -> usize {
        self.slots.read().len()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.slots.read().get(slot).cloned())
    }

    fn put(&self, slot: &str, value: &str) -> Result<()> {
        self.slots.write().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        self.slots.write().remove(slot);
        Ok(())
    }
}
