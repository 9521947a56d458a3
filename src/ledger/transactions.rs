//! Transaction Lifecycle
//! Mission: Drive pending deposits/withdrawals to their terminal state
//!
//! Pending → {Completed, Rejected}; both terminal states are absorbing.
//! Approval applies the balance effect through the persistence manager,
//! clamped at zero. Steps are individual store writes, not one atomic
//! commit; a crash between them can leave a partially-applied state. That
//! is the accepted consistency model here.

use super::models::{CompletedTransaction, PendingTransaction, TxKind, TxStatus, UserPatch};
use super::Ledger;
use crate::error::LedgerError;
use crate::store::{PENDING_TRANSACTIONS_SLOT, TRANSACTIONS_SLOT, USERS_SLOT};
use tracing::info;

impl Ledger {
    /// Submit a deposit or withdrawal request for admin approval. Does not
    /// touch the user record.
    pub fn submit_transaction(
        &self,
        user_id: &str,
        kind: TxKind,
        amount: f64,
    ) -> Result<PendingTransaction, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::ValidationFailed(
                "amount must be a positive number".to_string(),
            ));
        }
        let user = self
            .user_by_id(user_id)
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user_id)))?;

        let tx = PendingTransaction::new(&user.id, &user.name, kind, amount);
        let mut pending: Vec<PendingTransaction> =
            self.manager().load_collection(PENDING_TRANSACTIONS_SLOT);
        pending.push(tx.clone());
        self.manager()
            .store_collection(PENDING_TRANSACTIONS_SLOT, &pending);

        self.emit_changed(PENDING_TRANSACTIONS_SLOT);
        info!(
            "📥 {} request of {:.2} submitted by {} ({})",
            tx.kind.as_str(),
            tx.amount,
            tx.user_name,
            tx.id
        );
        Ok(tx)
    }

    /// Approve a pending transaction: apply the balance effect, append the
    /// completed entry to the log, remove the pending entry. Ids already
    /// consumed report `NotFound` and mutate nothing.
    pub fn approve_transaction(&self, id: &str) -> Result<CompletedTransaction, LedgerError> {
        let mut pending: Vec<PendingTransaction> =
            self.manager().load_collection(PENDING_TRANSACTIONS_SLOT);
        let index = pending
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("pending transaction {}", id)))?;
        let tx = pending.remove(index);

        // Balance effect. A vanished user makes this a no-op (updateUser
        // no-match semantics) and the approval still completes.
        if let Some(user) = self.user_by_id(&tx.user_id) {
            let new_balance = match tx.kind {
                TxKind::Deposit => user.cash_balance + tx.amount,
                TxKind::Withdrawal => user.cash_balance - tx.amount,
            };
            self.manager().update_user(
                &tx.user_id,
                &UserPatch {
                    cash_balance: Some(new_balance),
                    ..Default::default()
                },
            );
        }

        let completed = tx.into_completed(TxStatus::Completed);
        self.append_completed(completed.clone());
        self.manager()
            .store_collection(PENDING_TRANSACTIONS_SLOT, &pending);

        self.emit_changed(USERS_SLOT);
        self.emit_changed(PENDING_TRANSACTIONS_SLOT);
        info!(
            "✅ Approved {} of {:.2} for {} ({})",
            completed.kind.as_str(),
            completed.amount,
            completed.user_name,
            completed.id
        );
        Ok(completed)
    }

    /// Reject a pending transaction: log it as rejected, no balance
    /// change.
    pub fn reject_transaction(&self, id: &str) -> Result<CompletedTransaction, LedgerError> {
        let mut pending: Vec<PendingTransaction> =
            self.manager().load_collection(PENDING_TRANSACTIONS_SLOT);
        let index = pending
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("pending transaction {}", id)))?;
        let tx = pending.remove(index);

        let rejected = tx.into_completed(TxStatus::Rejected);
        self.append_completed(rejected.clone());
        self.manager()
            .store_collection(PENDING_TRANSACTIONS_SLOT, &pending);

        self.emit_changed(PENDING_TRANSACTIONS_SLOT);
        info!(
            "🚫 Rejected {} of {:.2} for {} ({})",
            rejected.kind.as_str(),
            rejected.amount,
            rejected.user_name,
            rejected.id
        );
        Ok(rejected)
    }

    /// Pending transactions awaiting admin action.
    pub fn pending_transactions(&self) -> Vec<PendingTransaction> {
        self.manager().load_collection(PENDING_TRANSACTIONS_SLOT)
    }

    /// Completed/rejected log, most recent first (display preference, not
    /// a correctness invariant).
    pub fn completed_transactions(&self) -> Vec<CompletedTransaction> {
        self.manager().load_collection(TRANSACTIONS_SLOT)
    }

    fn append_completed(&self, entry: CompletedTransaction) {
        let mut log: Vec<CompletedTransaction> = self.manager().load_collection(TRANSACTIONS_SLOT);
        log.insert(0, entry);
        self.manager().store_collection(TRANSACTIONS_SLOT, &log);
        self.emit_changed(TRANSACTIONS_SLOT);
    }
}
