//! ledgerd - TradeSim Ledger Daemon
//! Mission: Keep user account records alive through storage hiccups
//!
//! Wires the record store, persistence manager, transaction/KYC ledger and
//! integrity monitor together, runs the background loops, and performs an
//! emergency backup on shutdown.

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradesim_ledger::{
    events, monitor::ChangeHint, store::SqliteStore, Config, IntegrityMonitor, Ledger,
    LedgerEvent, PersistenceManager,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    info!("🚀 Starting tradesim-ledger (store: {})", config.database_path);

    let store: Arc<SqliteStore> = Arc::new(
        SqliteStore::new(&config.database_path)
            .with_context(|| format!("Failed to open record store at {}", config.database_path))?,
    );
    let manager = Arc::new(PersistenceManager::new(store.clone()));
    let event_tx = events::event_channel();

    let ledger = Ledger::new(manager.clone(), event_tx.clone());
    ledger.seed_default_admin();

    let monitor = Arc::new(IntegrityMonitor::new(
        store,
        manager.clone(),
        event_tx.clone(),
        config.monitor_startup_delay,
        config.monitor_check_interval,
        config.max_recovery_attempts,
    ));
    let monitor_handle = monitor.start();
    let resync_handle = manager.spawn_backup_resync(config.backup_resync_interval);

    // Forward data-change notifications to the monitor as early-check
    // hints, and log everything for the operator.
    let hint_tx = monitor.hint_sender();
    let mut event_rx = event_tx.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(LedgerEvent::DataChanged { collection }) => {
                    info!("📣 Data changed: {}", collection);
                    let _ = hint_tx.try_send(ChangeHint);
                }
                Ok(LedgerEvent::RecoveryCompleted { restored_count }) => {
                    info!("📣 Recovery completed, {} records restored", restored_count);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event logger lagged, {} notifications skipped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!(
        "Ledger ready: {} users, {} pending transactions, {} pending KYC requests",
        ledger.users().len(),
        ledger.pending_transactions().len(),
        ledger.pending_kyc().len()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    monitor.handle_before_shutdown();
    monitor.stop();
    if let Some(handle) = monitor_handle {
        handle.abort();
    }
    resync_handle.abort();
    event_logger.abort();

    info!("👋 tradesim-ledger stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradesim_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
