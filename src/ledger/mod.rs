//! Transaction / KYC Ledger
//!
//! The state machine governing pending financial transactions and pending
//! identity-verification requests, plus user registration. All reads and
//! writes go through the persistence manager; every externally-visible
//! state change emits a [`LedgerEvent`].

pub mod kyc;
pub mod models;
pub mod transactions;

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::persistence::PersistenceManager;
use crate::store::USERS_SLOT;
use chrono::Utc;
use models::UserRecord;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub account_type: String,
}

/// Ledger over the shared persistence manager.
pub struct Ledger {
    manager: Arc<PersistenceManager>,
    events: broadcast::Sender<LedgerEvent>,
}

impl Ledger {
    pub fn new(manager: Arc<PersistenceManager>, events: broadcast::Sender<LedgerEvent>) -> Self {
        Self { manager, events }
    }

    pub(crate) fn emit_changed(&self, collection: &str) {
        let _ = self.events.send(LedgerEvent::DataChanged {
            collection: collection.to_string(),
        });
    }

    /// Register a new user. Emails are normalized to lowercase and must be
    /// unique; passwords are stored bcrypt-hashed.
    pub fn register_user(&self, new_user: NewUser) -> Result<UserRecord, LedgerError> {
        let email = new_user.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(LedgerError::ValidationFailed(
                "a valid email address is required".to_string(),
            ));
        }
        if new_user.password.is_empty() {
            return Err(LedgerError::ValidationFailed(
                "password must not be empty".to_string(),
            ));
        }

        let users = self.manager.load_users();
        if users.iter().any(|u| u.email == email) {
            return Err(LedgerError::ValidationFailed(format!(
                "an account already exists for {}",
                email
            )));
        }

        let password_hash = bcrypt::hash(&new_user.password, bcrypt::DEFAULT_COST)
            .map_err(|_| LedgerError::ValidationFailed("password could not be hashed".to_string()))?;

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: new_user.name,
            email,
            password_hash,
            account_id: format!("ACC-{}", Uuid::new_v4().simple()),
            account_type: new_user.account_type,
            join_date: Utc::now().to_rfc3339(),
            cash_balance: 0.0,
            kyc_verified: false,
            kyc_level: None,
            kyc_approved_date: None,
            is_admin: false,
        };

        self.manager.add_user(user.clone());
        self.emit_changed(USERS_SLOT);
        info!("✅ Registered user {} ({})", user.name, user.email);
        Ok(user)
    }

    /// Seed a default admin account when the user collection is empty.
    pub fn seed_default_admin(&self) {
        if !self.manager.load_users().is_empty() {
            return;
        }
        let password_hash = match bcrypt::hash("admin123", bcrypt::DEFAULT_COST) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Failed to hash default admin password: {}", e);
                return;
            }
        };
        let admin = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            email: "admin@tradesim.local".to_string(),
            password_hash,
            account_id: format!("ACC-{}", Uuid::new_v4().simple()),
            account_type: "admin".to_string(),
            join_date: Utc::now().to_rfc3339(),
            cash_balance: 0.0,
            kyc_verified: true,
            kyc_level: Some(3),
            kyc_approved_date: Some(Utc::now().to_rfc3339()),
            is_admin: true,
        };
        self.manager.add_user(admin);
        self.emit_changed(USERS_SLOT);
        info!("🔐 Default admin user created (email: admin@tradesim.local)");
        warn!("⚠️  CHANGE DEFAULT PASSWORD IN PRODUCTION!");
    }

    /// All user records.
    pub fn users(&self) -> Vec<UserRecord> {
        self.manager.load_users()
    }

    /// Look up a user by normalized email.
    pub fn user_by_email(&self, email: &str) -> Option<UserRecord> {
        let normalized = email.trim().to_lowercase();
        self.manager
            .load_users()
            .into_iter()
            .find(|u| u.email == normalized)
    }

    pub(crate) fn user_by_id(&self, user_id: &str) -> Option<UserRecord> {
        self.manager
            .load_users()
            .into_iter()
            .find(|u| u.id == user_id)
    }

    pub(crate) fn manager(&self) -> &PersistenceManager {
        &self.manager
    }
}
