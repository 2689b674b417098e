//! In-memory Ledger Store
//!
//! A `LedgerStore` kept entirely in process. A unit of work holds the store's
//! lock for its whole lifetime (fully serialised) and mutates a working copy
//! that replaces the shared state only on commit.
//!
//! Failure points can be armed to make the next matching call fail, which is
//! how rollback paths are exercised without a database.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{AccountRef, BillRecord, BillStatus, HistoryFilter, NewBill};

use super::{AccountStore, BillStore, LedgerStore, StoreError, UnitOfWork};

/// Store call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    GetBalance,
    ApplyDelta,
    InsertBill,
    FindBill,
    UpdateBillStatus,
    BillHistory,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountRef, Decimal>,
    bills: Vec<BillRecord>,
    next_bill_id: i64,
}

#[derive(Debug, Default)]
struct Counters {
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
    abandoned: AtomicUsize,
}

#[derive(Debug, Default)]
struct Faults {
    armed: StdMutex<HashSet<FailPoint>>,
}

impl Faults {
    fn arm(&self, point: FailPoint) {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point);
    }

    /// Consume an armed fault, failing the call
    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let fired = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&point);
        if fired {
            return Err(StoreError::Unavailable(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

/// In-process ledger store
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite an account with the given balance
    pub async fn open_account(&self, account: AccountRef, balance: Decimal) {
        self.state.lock().await.accounts.insert(account, balance);
    }

    /// Builder-style seeding for tests and demos
    pub async fn with_account(self, account: AccountRef, balance: Decimal) -> Self {
        self.open_account(account, balance).await;
        self
    }

    /// Insert a bill directly, bypassing the engine
    pub async fn seed_bill(&self, bill: NewBill) -> i64 {
        let mut state = self.state.lock().await;
        state.next_bill_id += 1;
        let id = state.next_bill_id;
        state.bills.push(bill.into_record(id));
        id
    }

    /// Committed balance of an account
    pub async fn balance_of(&self, account: &AccountRef) -> Option<Decimal> {
        self.state.lock().await.accounts.get(account).copied()
    }

    /// All committed bills in insertion order
    pub async fn bills(&self) -> Vec<BillRecord> {
        self.state.lock().await.bills.clone()
    }

    /// Make the next call at `point` fail with `StoreError::Unavailable`
    pub fn fail_at(&self, point: FailPoint) {
        self.faults.arm(point);
    }

    pub fn units_begun(&self) -> usize {
        self.counters.begun.load(Ordering::SeqCst)
    }

    pub fn units_committed(&self) -> usize {
        self.counters.committed.load(Ordering::SeqCst)
    }

    pub fn units_rolled_back(&self) -> usize {
        self.counters.rolled_back.load(Ordering::SeqCst)
    }

    /// Units of work dropped without commit or rollback
    pub fn units_abandoned(&self) -> usize {
        self.counters.abandoned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Work = MemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Work, StoreError> {
        self.faults.trip(FailPoint::Begin)?;

        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        self.counters.begun.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryUnitOfWork {
            guard,
            working,
            counters: self.counters.clone(),
            faults: self.faults.clone(),
            finished: false,
        })
    }
}

/// Unit of work over `MemoryLedgerStore`
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
    finished: bool,
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.counters.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    async fn get_balance(&mut self, account: &AccountRef) -> Result<Decimal, StoreError> {
        self.faults.trip(FailPoint::GetBalance)?;
        self.working
            .accounts
            .get(account)
            .copied()
            .ok_or_else(|| StoreError::AccountNotFound(account.clone()))
    }

    async fn apply_delta(&mut self, account: &AccountRef, delta: Decimal) -> Result<(), StoreError> {
        self.faults.trip(FailPoint::ApplyDelta)?;
        let balance = self
            .working
            .accounts
            .get_mut(account)
            .ok_or_else(|| StoreError::AccountNotFound(account.clone()))?;
        *balance += delta;
        Ok(())
    }
}

#[async_trait]
impl BillStore for MemoryUnitOfWork {
    async fn insert_bill(&mut self, bill: &NewBill) -> Result<i64, StoreError> {
        self.faults.trip(FailPoint::InsertBill)?;

        // Mirrors the unique index on transaction_id
        if self
            .working
            .bills
            .iter()
            .any(|existing| existing.transaction_id == bill.transaction_id)
        {
            return Err(StoreError::Unavailable(format!(
                "duplicate transaction id {}",
                bill.transaction_id
            )));
        }

        self.working.next_bill_id += 1;
        let id = self.working.next_bill_id;
        self.working.bills.push(bill.clone().into_record(id));
        Ok(id)
    }

    async fn find_bill(&mut self, transaction_id: &str) -> Result<BillRecord, StoreError> {
        self.faults.trip(FailPoint::FindBill)?;
        self.working
            .bills
            .iter()
            .find(|bill| bill.transaction_id == transaction_id)
            .cloned()
            .ok_or_else(|| StoreError::BillNotFound(transaction_id.to_string()))
    }

    async fn update_bill_status(
        &mut self,
        transaction_id: &str,
        status: BillStatus,
    ) -> Result<(), StoreError> {
        self.faults.trip(FailPoint::UpdateBillStatus)?;
        let bill = self
            .working
            .bills
            .iter_mut()
            .find(|bill| bill.transaction_id == transaction_id)
            .ok_or_else(|| StoreError::BillNotFound(transaction_id.to_string()))?;
        bill.status = status;
        Ok(())
    }

    async fn bill_history(
        &mut self,
        account: &AccountRef,
        filter: &HistoryFilter,
    ) -> Result<Vec<BillRecord>, StoreError> {
        self.faults.trip(FailPoint::BillHistory)?;
        let mut history: Vec<BillRecord> = self
            .working
            .bills
            .iter()
            .filter(|bill| bill.involves(account) && filter.matches(account, bill))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(history)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(mut self) -> Result<(), StoreError> {
        self.faults.trip(FailPoint::Commit)?;
        *self.guard = std::mem::take(&mut self.working);
        self.finished = true;
        self.counters.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
