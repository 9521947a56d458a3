//! Integrity Monitor
//! Mission: Detect user-record loss and restore from the best backup
//!
//! The store offers no transactional guarantees and can be written by
//! multiple uncoordinated writers, so the cheapest available loss detector
//! is a count-drop heuristic: a current record count below the last
//! known-good count is treated as a loss event. A legitimate bulk deletion
//! looks identical and will be "recovered"; this is an accepted limitation,
//! not a bug to fix here.

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::persistence::PersistenceManager;
use crate::store::{SharedStore, LAST_KNOWN_USER_COUNT_SLOT, USERS_SLOT};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// External "something may have changed" hint that triggers an early
/// integrity pass ahead of the next scheduled tick.
#[derive(Debug, Clone, Copy)]
pub struct ChangeHint;

/// Read-only diagnostics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub is_monitoring: bool,
    pub last_known_user_count: usize,
    pub recovery_attempts: u32,
    pub current_user_count: usize,
}

/// Process-wide integrity monitor. Started once, stoppable idempotently.
pub struct IntegrityMonitor {
    store: SharedStore,
    manager: Arc<PersistenceManager>,
    events: broadcast::Sender<LedgerEvent>,
    running: AtomicBool,
    recovery_attempts: AtomicU32,
    max_recovery_attempts: u32,
    startup_delay: Duration,
    check_interval: Duration,
    hint_tx: mpsc::Sender<ChangeHint>,
    hint_rx: Mutex<Option<mpsc::Receiver<ChangeHint>>>,
}

impl IntegrityMonitor {
    pub fn new(
        store: SharedStore,
        manager: Arc<PersistenceManager>,
        events: broadcast::Sender<LedgerEvent>,
        startup_delay: Duration,
        check_interval: Duration,
        max_recovery_attempts: u32,
    ) -> Self {
        let (hint_tx, hint_rx) = mpsc::channel(64);
        Self {
            store,
            manager,
            events,
            running: AtomicBool::new(false),
            recovery_attempts: AtomicU32::new(0),
            max_recovery_attempts,
            startup_delay,
            check_interval,
            hint_tx,
            hint_rx: Mutex::new(Some(hint_rx)),
        }
    }

    /// Sender half of the change-hint fast path. Dropping hints is fine;
    /// the periodic tick catches up.
    pub fn hint_sender(&self) -> mpsc::Sender<ChangeHint> {
        self.hint_tx.clone()
    }

    /// Start the monitoring loop. Returns `None` when already running.
    pub fn start(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Integrity monitor already running");
            return None;
        }
        // A restart after stop has no receiver left; it runs on the
        // periodic tick alone.
        let mut hint_rx = self.hint_rx.lock().take();

        let monitor = Arc::clone(self);
        Some(tokio::spawn(async move {
            // Let the record store settle before the first pass.
            tokio::time::sleep(monitor.startup_delay).await;

            if monitor.last_known_count() == 0 {
                monitor.update_user_count();
            }
            info!(
                "🔎 Integrity monitor started (interval {:?}, baseline {} users)",
                monitor.check_interval,
                monitor.last_known_count()
            );

            let mut ticker = interval(monitor.check_interval);
            ticker.tick().await;
            loop {
                if !monitor.running.load(Ordering::SeqCst) {
                    info!("Integrity monitor stopped");
                    break;
                }
                match hint_rx.as_mut() {
                    Some(rx) => {
                        tokio::select! {
                            _ = ticker.tick() => {
                                monitor.check_user_integrity();
                            }
                            // The monitor owns a sender, so the channel
                            // cannot close while this task runs.
                            Some(_) = rx.recv() => {
                                debug!("Change hint received, running early integrity pass");
                                monitor.check_user_integrity();
                            }
                        }
                    }
                    None => {
                        ticker.tick().await;
                        monitor.check_user_integrity();
                    }
                }
            }
        }))
    }

    /// Stop the loop. Safe to call repeatedly or before `start`.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Persisted last known-good record count. Missing or unreadable
    /// state reads as zero.
    pub fn last_known_count(&self) -> usize {
        match self.store.get(LAST_KNOWN_USER_COUNT_SLOT) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to read last known user count: {:#}", e);
                0
            }
        }
    }

    fn set_last_known_count(&self, count: usize) {
        if let Err(e) = self
            .store
            .put(LAST_KNOWN_USER_COUNT_SLOT, &count.to_string())
        {
            warn!("Failed to persist last known user count: {:#}", e);
        }
    }

    /// Recompute and persist the baseline count from the best currently
    /// available copy.
    pub fn update_user_count(&self) {
        let count = self.manager.best_available_users().len();
        self.set_last_known_count(count);
        debug!("Baseline user count set to {}", count);
    }

    /// One integrity pass: a count drop is a loss event and triggers
    /// recovery; growth advances the baseline and re-syncs all backups
    /// from the larger set.
    pub fn check_user_integrity(&self) {
        let current = self.manager.best_available_users();
        let last_known = self.last_known_count();

        if current.len() < last_known {
            warn!(
                "⚠️ Possible user data loss: {} records now vs {} last known",
                current.len(),
                last_known
            );
            if let Err(e) = self.attempt_recovery() {
                error!("Recovery failed: {}", e);
            }
        } else if current.len() > last_known {
            debug!(
                "User collection grew {} -> {}, advancing baseline and re-syncing backups",
                last_known,
                current.len()
            );
            self.set_last_known_count(current.len());
            self.manager.sync_backups(&current);
        }
    }

    /// Restore the canonical slot from the longest valid backup. Attempts
    /// are bounded; the budget only resets on success or `force_recovery`.
    pub fn attempt_recovery(&self) -> Result<usize, LedgerError> {
        let attempts = self.recovery_attempts.load(Ordering::SeqCst);
        if attempts >= self.max_recovery_attempts {
            return Err(LedgerError::RecoveryExhausted { attempts });
        }
        self.recovery_attempts.fetch_add(1, Ordering::SeqCst);

        let (slot, users) = match self.manager.best_backup_users() {
            Some(found) => found,
            None => {
                warn!("Recovery attempt found no valid non-empty backup");
                return Err(LedgerError::StoreUnavailable(
                    "no valid backup available for recovery".to_string(),
                ));
            }
        };

        // A recovery must never shrink the canonical collection.
        if let Some(canonical) = self.manager.read_slot_users(USERS_SLOT) {
            if canonical.len() >= users.len() {
                debug!(
                    "Canonical slot ({}) already at least as large as best backup ({}), leaving unchanged",
                    canonical.len(),
                    users.len()
                );
                self.set_last_known_count(canonical.len());
                self.recovery_attempts.store(0, Ordering::SeqCst);
                return Ok(canonical.len());
            }
        }

        self.manager.save_users(&users);
        self.set_last_known_count(users.len());
        self.recovery_attempts.store(0, Ordering::SeqCst);

        info!("✅ Recovered {} user records from '{}'", users.len(), slot);
        let _ = self.events.send(LedgerEvent::RecoveryCompleted {
            restored_count: users.len(),
        });
        let _ = self.events.send(LedgerEvent::DataChanged {
            collection: USERS_SLOT.to_string(),
        });
        Ok(users.len())
    }

    /// Manual trigger: reset the retry budget and recover unconditionally.
    pub fn force_recovery(&self) -> Result<usize, LedgerError> {
        info!("Force recovery requested");
        self.recovery_attempts.store(0, Ordering::SeqCst);
        self.attempt_recovery()
    }

    /// Final best-effort backup on process teardown.
    pub fn handle_before_shutdown(&self) {
        let users = self.manager.best_available_users();
        if users.is_empty() {
            debug!("Emergency backup skipped, no user records available");
            return;
        }
        self.manager.sync_backups(&users);
        info!("💾 Emergency backup written ({} records)", users.len());
    }

    /// Diagnostics snapshot.
    pub fn get_status(&self) -> MonitorStatus {
        MonitorStatus {
            is_monitoring: self.running.load(Ordering::SeqCst),
            last_known_user_count: self.last_known_count(),
            recovery_attempts: self.recovery_attempts.load(Ordering::SeqCst),
            current_user_count: self.manager.best_available_users().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::ledger::models::UserRecord;
    use crate::store::{MemoryStore, RecordStore, USER_BACKUP_SLOTS};

    fn users(n: usize) -> Vec<UserRecord> {
        (0..n)
            .map(|i| UserRecord {
                id: format!("u{}", i),
                name: format!("User {}", i),
                email: format!("u{}@example.com", i),
                password_hash: "hash".to_string(),
                account_id: format!("ACC-{}", i),
                account_type: "standard".to_string(),
                join_date: "2026-01-01T00:00:00Z".to_string(),
                cash_balance: 0.0,
                kyc_verified: false,
                kyc_level: None,
                kyc_approved_date: None,
                is_admin: false,
            })
            .collect()
    }

    fn setup(max_attempts: u32) -> (Arc<MemoryStore>, Arc<PersistenceManager>, IntegrityMonitor) {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(PersistenceManager::new(store.clone()));
        let monitor = IntegrityMonitor::new(
            store.clone(),
            manager.clone(),
            event_channel(),
            Duration::from_millis(1),
            Duration::from_millis(10),
            max_attempts,
        );
        (store, manager, monitor)
    }

    #[test]
    fn test_count_drop_triggers_recovery() {
        let (store, manager, monitor) = setup(5);
        manager.save_users(&users(5));
        monitor.update_user_count();

        // Canonical loses records; backups still hold the full set.
        store
            .put(USERS_SLOT, &serde_json::to_string(&users(2)).unwrap())
            .unwrap();

        monitor.check_user_integrity();

        assert_eq!(manager.read_slot_users(USERS_SLOT).unwrap().len(), 5);
        assert_eq!(monitor.last_known_count(), 5);
        assert_eq!(monitor.get_status().recovery_attempts, 0); // reset on success
    }

    #[test]
    fn test_growth_advances_baseline_and_syncs_backups() {
        let (store, manager, monitor) = setup(5);
        manager.save_users(&users(3));
        monitor.update_user_count();

        // Grow the canonical slot outside the manager's save path.
        store
            .put(USERS_SLOT, &serde_json::to_string(&users(6)).unwrap())
            .unwrap();

        monitor.check_user_integrity();

        assert_eq!(monitor.last_known_count(), 6);
        for slot in USER_BACKUP_SLOTS {
            assert_eq!(manager.read_slot_users(slot).unwrap().len(), 6);
        }
    }

    #[test]
    fn test_recovery_never_shrinks_canonical() {
        let (store, manager, monitor) = setup(5);
        // Canonical holds 4, best backup only 3, baseline claims 6.
        store
            .put(USERS_SLOT, &serde_json::to_string(&users(4)).unwrap())
            .unwrap();
        store
            .put(
                USER_BACKUP_SLOTS[0],
                &serde_json::to_string(&users(3)).unwrap(),
            )
            .unwrap();
        monitor.set_last_known_count(6);

        monitor.check_user_integrity();

        assert_eq!(manager.read_slot_users(USERS_SLOT).unwrap().len(), 4);
    }

    #[test]
    fn test_recovery_exhaustion_and_force_reset() {
        let (_, _, monitor) = setup(2);
        // No backups exist, so every attempt fails and burns budget.
        assert!(matches!(
            monitor.attempt_recovery(),
            Err(LedgerError::StoreUnavailable(_))
        ));
        assert!(matches!(
            monitor.attempt_recovery(),
            Err(LedgerError::StoreUnavailable(_))
        ));
        assert!(matches!(
            monitor.attempt_recovery(),
            Err(LedgerError::RecoveryExhausted { attempts: 2 })
        ));

        // force_recovery resets the budget and retries.
        assert!(matches!(
            monitor.force_recovery(),
            Err(LedgerError::StoreUnavailable(_))
        ));
        assert_eq!(monitor.get_status().recovery_attempts, 1);
    }

    #[test]
    fn test_recovery_emits_events() {
        let (store, manager, monitor) = setup(5);
        manager.save_users(&users(4));
        let mut rx = monitor.events.subscribe();

        store
            .put(USERS_SLOT, &serde_json::to_string(&users(1)).unwrap())
            .unwrap();
        monitor.set_last_known_count(4);
        monitor.check_user_integrity();

        match rx.try_recv().unwrap() {
            LedgerEvent::RecoveryCompleted { restored_count } => assert_eq!(restored_count, 4),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emergency_backup_writes_all_slots() {
        let (store, manager, monitor) = setup(5);
        manager.save_users(&users(2));
        // Wipe one backup, then shut down.
        store.remove(USER_BACKUP_SLOTS[1]).unwrap();

        monitor.handle_before_shutdown();

        for slot in USER_BACKUP_SLOTS {
            assert_eq!(manager.read_slot_users(slot).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_status_snapshot() {
        let (_, manager, monitor) = setup(5);
        manager.save_users(&users(3));
        monitor.update_user_count();

        let status = monitor.get_status();
        assert!(!status.is_monitoring);
        assert_eq!(status.last_known_user_count, 3);
        assert_eq!(status.current_user_count, 3);
        assert_eq!(status.recovery_attempts, 0);
    }

    #[tokio::test]
    async fn test_start_is_singleton_and_stop_idempotent() {
        let (_, manager, monitor) = setup(5);
        manager.save_users(&users(1));
        let monitor = Arc::new(monitor);

        let handle = monitor.start();
        assert!(handle.is_some());
        assert!(monitor.start().is_none()); // second start refused

        monitor.stop();
        monitor.stop(); // idempotent
        assert!(!monitor.get_status().is_monitoring);
    }
}
