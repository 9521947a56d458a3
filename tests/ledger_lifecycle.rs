//! Integration tests for the full ledger lifecycle
//!
//! These tests run the subsystem end-to-end against a real SQLite-backed
//! record store: registration, transaction and KYC approval flows,
//! multi-copy persistence across process "restarts" (fresh handles over
//! the same database), and integrity recovery after canonical-slot damage.

use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tradesim_ledger::events::event_channel;
use tradesim_ledger::ledger::models::{KycDocument, TxKind, TxStatus};
use tradesim_ledger::ledger::NewUser;
use tradesim_ledger::store::{RecordStore, SqliteStore, USERS_SLOT, USER_BACKUP_SLOTS};
use tradesim_ledger::{IntegrityMonitor, Ledger, PersistenceManager};

fn open(path: &str) -> (Arc<SqliteStore>, Arc<PersistenceManager>, Ledger) {
    let store = Arc::new(SqliteStore::new(path).unwrap());
    let manager = Arc::new(PersistenceManager::new(store.clone()));
    let ledger = Ledger::new(manager.clone(), event_channel());
    (store, manager, ledger)
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        name: "Grace".to_string(),
        email: email.to_string(),
        password: "hopper".to_string(),
        account_type: "standard".to_string(),
    }
}

#[test]
fn deposit_flow_survives_restart() {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap().to_string();

    let user_id = {
        let (_, _, ledger) = open(&path);
        let user = ledger.register_user(new_user("grace@example.com")).unwrap();
        let tx = ledger
            .submit_transaction(&user.id, TxKind::Deposit, 100.0)
            .unwrap();
        ledger.approve_transaction(&tx.id).unwrap();
        user.id
    };

    // Fresh handles over the same database simulate a process restart.
    let (_, manager, ledger) = open(&path);
    let users = manager.load_users();
    let user = users.iter().find(|u| u.id == user_id).unwrap();
    assert_eq!(user.cash_balance, 100.0);
    assert!(ledger.pending_transactions().is_empty());
    assert_eq!(ledger.completed_transactions().len(), 1);
    assert_eq!(ledger.completed_transactions()[0].status, TxStatus::Completed);
}

#[test]
fn canonical_corruption_recovers_from_backups() {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap().to_string();

    let (store, manager, ledger) = open(&path);
    ledger.register_user(new_user("grace@example.com")).unwrap();
    ledger.register_user(new_user("ada@example.com")).unwrap();

    // Canonical slot takes damage; every backup still holds both records.
    store.put(USERS_SLOT, "}}corrupt").unwrap();

    let recovered = manager.load_users();
    assert_eq!(recovered.len(), 2);

    // The fallback read repaired the canonical slot in passing.
    let repaired = store.get(USERS_SLOT).unwrap().unwrap();
    assert!(repaired.starts_with('['));
}

#[test]
fn monitor_restores_after_partial_loss() {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap().to_string();

    let (store, manager, _ledger) = open(&path);
    let users: Vec<_> = (0..5)
        .map(|i| {
            let (_, _, ledger) = open(&path);
            ledger
                .register_user(new_user(&format!("u{}@example.com", i)))
                .unwrap()
        })
        .collect();
    assert_eq!(users.len(), 5);

    let monitor = IntegrityMonitor::new(
        store.clone(),
        manager.clone(),
        event_channel(),
        Duration::from_millis(1),
        Duration::from_millis(50),
        5,
    );
    monitor.update_user_count();
    assert_eq!(monitor.get_status().last_known_user_count, 5);

    // Simulate an uncoordinated writer truncating the canonical slot.
    let truncated = serde_json::to_string(&manager.load_users()[..2].to_vec()).unwrap();
    store.put(USERS_SLOT, &truncated).unwrap();

    monitor.check_user_integrity();

    assert_eq!(manager.load_users().len(), 5);
    assert_eq!(monitor.get_status().last_known_user_count, 5);
    assert_eq!(monitor.get_status().recovery_attempts, 0);
}

#[test]
fn kyc_rejection_leaves_user_unverified() {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap().to_string();

    let (_, manager, ledger) = open(&path);
    let user = ledger.register_user(new_user("grace@example.com")).unwrap();
    let request = ledger
        .submit_kyc(
            &user.id,
            2,
            vec![KycDocument {
                doc_type: "passport".to_string(),
                number: Some("P42".to_string()),
            }],
        )
        .unwrap();

    ledger.reject_kyc(&request.id).unwrap();

    let user = &manager.load_users()[0];
    assert!(!user.kyc_verified);
    assert!(user.kyc_level.is_none());
    assert!(ledger.pending_kyc().is_empty());
}

#[test]
fn emergency_backup_heals_missing_backup_slots() {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap().to_string();

    let (store, manager, ledger) = open(&path);
    ledger.register_user(new_user("grace@example.com")).unwrap();
    for slot in USER_BACKUP_SLOTS {
        store.remove(slot).unwrap();
    }

    let monitor = IntegrityMonitor::new(
        store.clone(),
        manager.clone(),
        event_channel(),
        Duration::from_millis(1),
        Duration::from_millis(50),
        5,
    );
    monitor.handle_before_shutdown();

    for slot in USER_BACKUP_SLOTS {
        assert_eq!(manager.read_slot_users(slot).unwrap().len(), 1);
    }
}

#[tokio::test]
async fn monitor_loop_reacts_to_change_hints() {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap().to_string();

    let (store, manager, ledger) = open(&path);
    for i in 0..3 {
        ledger
            .register_user(new_user(&format!("u{}@example.com", i)))
            .unwrap();
    }

    let monitor = Arc::new(IntegrityMonitor::new(
        store.clone(),
        manager.clone(),
        event_channel(),
        Duration::from_millis(1),
        // Long interval so only the hint can plausibly trigger the check.
        Duration::from_secs(3600),
        5,
    ));
    monitor.update_user_count();
    let handle = monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let truncated = serde_json::to_string(&manager.load_users()[..1].to_vec()).unwrap();
    store.put(USERS_SLOT, &truncated).unwrap();
    monitor
        .hint_sender()
        .send(tradesim_ledger::monitor::ChangeHint)
        .await
        .unwrap();

    // Give the loop a moment to process the hint.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(manager.load_users().len(), 3);

    monitor.stop();
    handle.abort();
}
