//! Ledger Data Models
//! Mission: Define the persisted account, transaction, and KYC structures
//!
//! Field names serialize in camelCase to match the persisted slot layout
//! the UI and the remote mirror already understand.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account record. Created on registration; mutated by balance
/// updates and KYC approval; never hard-deleted in normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    /// Stored normalized (trimmed, lowercased). Exactly one record per
    /// normalized email.
    pub email: String,
    pub password_hash: String,
    pub account_id: String,
    pub account_type: String,
    pub join_date: String,
    /// Clamped at zero on every write; never observed negative.
    pub cash_balance: f64,
    pub kyc_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_approved_date: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Partial update applied to a [`UserRecord`] by shallow merge. Absent
/// fields leave the record untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub account_type: Option<String>,
    pub cash_balance: Option<f64>,
    pub kyc_verified: Option<bool>,
    pub kyc_level: Option<u8>,
    pub kyc_approved_date: Option<String>,
}

impl UserPatch {
    /// Merge this patch into `user`. Balance writes are clamped at zero so
    /// no caller can persist a negative balance.
    pub fn apply(&self, user: &mut UserRecord) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.trim().to_lowercase();
        }
        if let Some(account_type) = &self.account_type {
            user.account_type = account_type.clone();
        }
        if let Some(balance) = self.cash_balance {
            user.cash_balance = balance.max(0.0);
        }
        if let Some(verified) = self.kyc_verified {
            user.kyc_verified = verified;
        }
        if let Some(level) = self.kyc_level {
            user.kyc_level = Some(level);
        }
        if let Some(date) = &self.kyc_approved_date {
            user.kyc_approved_date = Some(date.clone());
        }
    }
}

/// Transaction direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Deposit,
    Withdrawal,
}

impl TxKind {
    pub fn as_str(&self) -> &str {
        match self {
            TxKind::Deposit => "deposit",
            TxKind::Withdrawal => "withdrawal",
        }
    }
}

/// Transaction lifecycle state. `Completed` and `Rejected` are absorbing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Rejected,
}

/// A financial transaction awaiting admin approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub amount: f64,
    pub status: TxStatus,
    pub date: String,
}

impl PendingTransaction {
    pub fn new(user_id: &str, user_name: &str, kind: TxKind, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            kind,
            amount,
            status: TxStatus::Pending,
            date: Utc::now().to_rfc3339(),
        }
    }

    /// Consume this pending entry into its terminal log form.
    pub fn into_completed(self, status: TxStatus) -> CompletedTransaction {
        CompletedTransaction {
            id: self.id,
            user_id: self.user_id,
            user_name: self.user_name,
            kind: self.kind,
            amount: self.amount,
            status,
            date: self.date,
            completed_date: Utc::now().to_rfc3339(),
        }
    }
}

/// A consumed transaction in the append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTransaction {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub amount: f64,
    pub status: TxStatus,
    pub date: String,
    pub completed_date: String,
}

/// A document reference attached to a KYC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

/// An identity-verification request awaiting admin action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingKycRequest {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub level: u8,
    pub documents: Vec<KycDocument>,
    pub status: TxStatus,
    pub date: String,
}

impl PendingKycRequest {
    pub fn new(user: &UserRecord, level: u8, documents: Vec<KycDocument>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            level,
            documents,
            status: TxStatus::Pending,
            date: Utc::now().to_rfc3339(),
        }
    }
}
