//! Store Errors
//!
//! Error types for account and bill persistence.

use crate::domain::{AccountRef, UnknownVariant};

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No account matches the reference
    #[error("Account not found: {0}")]
    AccountNotFound(AccountRef),

    /// No bill matches the transaction id
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded into domain types
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Store could not serve the request (connection lost, injected fault)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::CorruptRow(err.to_string())
    }
}
