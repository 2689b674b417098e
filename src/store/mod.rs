//! Store module
//!
//! Persistence capabilities used by the ledger engine. The engine only sees
//! these traits; `PgLedgerStore` backs them with PostgreSQL and
//! `MemoryLedgerStore` with an in-process map for tests.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{AccountRef, BillRecord, BillStatus, HistoryFilter, NewBill};

pub use error::StoreError;
pub use memory::{FailPoint, MemoryLedgerStore};
pub use postgres::PgLedgerStore;

/// Balance lookups and signed balance deltas
#[async_trait]
pub trait AccountStore: Send {
    /// Current balance; `AccountNotFound` if no account matches.
    ///
    /// The account stays locked against concurrent writers until the unit of
    /// work ends.
    async fn get_balance(&mut self, account: &AccountRef) -> Result<Decimal, StoreError>;

    /// Add `delta` to the stored balance. Does not enforce non-negativity.
    async fn apply_delta(&mut self, account: &AccountRef, delta: Decimal) -> Result<(), StoreError>;
}

/// Bill record persistence
#[async_trait]
pub trait BillStore: Send {
    /// Insert a bill and return its store-assigned id
    async fn insert_bill(&mut self, bill: &NewBill) -> Result<i64, StoreError>;

    /// Find a bill by its external transaction id, locking it
    async fn find_bill(&mut self, transaction_id: &str) -> Result<BillRecord, StoreError>;

    /// Overwrite the status of a bill
    async fn update_bill_status(
        &mut self,
        transaction_id: &str,
        status: BillStatus,
    ) -> Result<(), StoreError>;

    /// Bills where `account` is sender or destination, newest first
    async fn bill_history(
        &mut self,
        account: &AccountRef,
        filter: &HistoryFilter,
    ) -> Result<Vec<BillRecord>, StoreError>;
}

/// Atomic scope over account and bill operations.
///
/// Either `commit` applies every change made through this unit of work or
/// none of them are visible. Dropping it without committing rolls back.
#[async_trait]
pub trait UnitOfWork: AccountStore + BillStore {
    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Factory for units of work
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Work: UnitOfWork + 'static;

    async fn begin(&self) -> Result<Self::Work, StoreError>;
}
