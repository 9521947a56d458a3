//! KYC Lifecycle
//! Mission: Drive identity-verification requests to approval or rejection
//!
//! Isomorphic to the transaction lifecycle, with two differences: approval
//! mutates the user's verification fields instead of a balance, and
//! rejection simply removes the request (no log slot exists for KYC).

use super::models::{KycDocument, PendingKycRequest, UserPatch};
use super::Ledger;
use crate::error::LedgerError;
use crate::store::{PENDING_KYC_SLOT, USERS_SLOT};
use chrono::Utc;
use tracing::info;

impl Ledger {
    /// Submit a verification request for admin review. Requires at least
    /// one document reference and a level of 1–3.
    pub fn submit_kyc(
        &self,
        user_id: &str,
        level: u8,
        documents: Vec<KycDocument>,
    ) -> Result<PendingKycRequest, LedgerError> {
        if !(1..=3).contains(&level) {
            return Err(LedgerError::ValidationFailed(
                "KYC level must be 1, 2 or 3".to_string(),
            ));
        }
        if documents.is_empty() {
            return Err(LedgerError::ValidationFailed(
                "at least one document reference is required".to_string(),
            ));
        }
        let user = self
            .user_by_id(user_id)
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user_id)))?;

        let request = PendingKycRequest::new(&user, level, documents);
        let mut pending: Vec<PendingKycRequest> = self.manager().load_collection(PENDING_KYC_SLOT);
        pending.push(request.clone());
        self.manager().store_collection(PENDING_KYC_SLOT, &pending);

        self.emit_changed(PENDING_KYC_SLOT);
        info!(
            "🪪 KYC level {} request submitted by {} ({})",
            request.level, request.user_name, request.id
        );
        Ok(request)
    }

    /// Approve a pending KYC request: mark the user verified at the
    /// requested level and remove the request.
    pub fn approve_kyc(&self, id: &str) -> Result<PendingKycRequest, LedgerError> {
        let mut pending: Vec<PendingKycRequest> = self.manager().load_collection(PENDING_KYC_SLOT);
        let index = pending
            .iter()
            .position(|req| req.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("pending KYC request {}", id)))?;
        let request = pending.remove(index);

        self.manager().update_user(
            &request.user_id,
            &UserPatch {
                kyc_verified: Some(true),
                kyc_level: Some(request.level),
                kyc_approved_date: Some(Utc::now().to_rfc3339()),
                ..Default::default()
            },
        );
        self.manager().store_collection(PENDING_KYC_SLOT, &pending);

        self.emit_changed(USERS_SLOT);
        self.emit_changed(PENDING_KYC_SLOT);
        info!(
            "✅ KYC level {} approved for {} ({})",
            request.level, request.user_name, request.id
        );
        Ok(request)
    }

    /// Reject a pending KYC request: remove it, no user mutation.
    pub fn reject_kyc(&self, id: &str) -> Result<(), LedgerError> {
        let mut pending: Vec<PendingKycRequest> = self.manager().load_collection(PENDING_KYC_SLOT);
        let index = pending
            .iter()
            .position(|req| req.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("pending KYC request {}", id)))?;
        let request = pending.remove(index);
        self.manager().store_collection(PENDING_KYC_SLOT, &pending);

        self.emit_changed(PENDING_KYC_SLOT);
        info!(
            "🚫 KYC level {} rejected for {} ({})",
            request.level, request.user_name, request.id
        );
        Ok(())
    }

    /// Verification requests awaiting admin action.
    pub fn pending_kyc(&self) -> Vec<PendingKycRequest> {
        self.manager().load_collection(PENDING_KYC_SLOT)
    }
}
