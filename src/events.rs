//! Ledger Event Bus
//! Mission: Tell the UI layer when its view of the world went stale

use serde::Serialize;
use tokio::sync::broadcast;

/// Notifications emitted on every externally-visible state change.
///
/// The UI layer subscribes and refreshes its view; the integrity monitor
/// additionally announces completed recoveries so the UI can surface them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A persisted collection changed; `collection` names the slot.
    DataChanged { collection: String },
    /// A recovery episode finished successfully.
    RecoveryCompleted { restored_count: usize },
}

/// Create the shared event channel. Capacity is generous because slow
/// subscribers only lose notifications, never data.
pub fn event_channel() -> broadcast::Sender<LedgerEvent> {
    let (tx, _rx) = broadcast::channel(256);
    tx
}
