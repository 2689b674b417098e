//! PostgreSQL Ledger Store
//!
//! One database transaction per unit of work. Accounts and bills read during
//! a unit of work are locked with `SELECT ... FOR UPDATE`, so a concurrent
//! operation on the same row waits until this one commits or rolls back and
//! then re-reads the committed balance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{AccountRef, BillRecord, BillStatus, HistoryFilter, NewBill};

use super::{AccountStore, BillStore, LedgerStore, StoreError, UnitOfWork};

/// Raw `bills` row as selected by this module
type BillRow = (
    i64,
    String,
    String,
    String,
    String,
    Decimal,
    DateTime<Utc>,
    String,
    String,
    String,
);

const BILL_COLUMNS: &str = r#"
    id, transaction_id, sender_kind, sender_ref, operation_type,
    amount, date, destination_kind, destination_ref, status
"#;

fn bill_from_row(row: BillRow) -> Result<BillRecord, StoreError> {
    let (
        id,
        transaction_id,
        sender_kind,
        sender_ref,
        operation,
        amount,
        date,
        destination_kind,
        destination_ref,
        status,
    ) = row;

    Ok(BillRecord {
        id,
        transaction_id,
        sender: AccountRef::new(sender_kind.parse()?, sender_ref),
        operation: operation.parse()?,
        amount,
        date,
        destination: AccountRef::new(destination_kind.parse()?, destination_ref),
        status: status.parse()?,
    })
}

/// Ledger store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Work = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Work, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// Unit of work wrapping a database transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn get_balance(&mut self, account: &AccountRef) -> Result<Decimal, StoreError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT balance FROM accounts
            WHERE kind = $1 AND reference = $2
            FOR UPDATE
            "#,
        )
        .bind(account.kind.as_str())
        .bind(&account.reference)
        .fetch_optional(&mut *self.tx)
        .await?;

        balance.ok_or_else(|| StoreError::AccountNotFound(account.clone()))
    }

    async fn apply_delta(&mut self, account: &AccountRef, delta: Decimal) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + $3, updated_at = NOW()
            WHERE kind = $1 AND reference = $2
            "#,
        )
        .bind(account.kind.as_str())
        .bind(&account.reference)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::AccountNotFound(account.clone()));
        }

        Ok(())
    }
}

#[async_trait]
impl BillStore for PgUnitOfWork {
    async fn insert_bill(&mut self, bill: &NewBill) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bills (
                transaction_id, sender_kind, sender_ref, operation_type,
                amount, date, destination_kind, destination_ref, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&bill.transaction_id)
        .bind(bill.sender.kind.as_str())
        .bind(&bill.sender.reference)
        .bind(bill.operation.as_str())
        .bind(bill.amount.value())
        .bind(bill.date)
        .bind(bill.destination.kind.as_str())
        .bind(&bill.destination.reference)
        .bind(bill.status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn find_bill(&mut self, transaction_id: &str) -> Result<BillRecord, StoreError> {
        let query = format!(
            "SELECT {} FROM bills WHERE transaction_id = $1 FOR UPDATE",
            BILL_COLUMNS
        );
        let row: Option<BillRow> = sqlx::query_as(&query)
            .bind(transaction_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => bill_from_row(row),
            None => Err(StoreError::BillNotFound(transaction_id.to_string())),
        }
    }

    async fn update_bill_status(
        &mut self,
        transaction_id: &str,
        status: BillStatus,
    ) -> Result<(), StoreError> {
        let rows_affected = sqlx::query("UPDATE bills SET status = $2 WHERE transaction_id = $1")
            .bind(transaction_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::BillNotFound(transaction_id.to_string()));
        }

        Ok(())
    }

    async fn bill_history(
        &mut self,
        account: &AccountRef,
        filter: &HistoryFilter,
    ) -> Result<Vec<BillRecord>, StoreError> {
        // NULL parameters disable their filter
        let query = format!(
            r#"
            SELECT {} FROM bills
            WHERE ((sender_kind = $1 AND sender_ref = $2)
                OR (destination_kind = $1 AND destination_ref = $2))
              AND ($3::text IS NULL OR operation_type = $3)
              AND ($4::text IS NULL OR
                   CASE WHEN sender_kind = $1 AND sender_ref = $2
                        THEN destination_kind ELSE sender_kind END = $4)
              AND ($5::numeric IS NULL OR amount > $5)
              AND ($6::numeric IS NULL OR amount < $6)
            ORDER BY date DESC, id DESC
            "#,
            BILL_COLUMNS
        );

        let rows: Vec<BillRow> = sqlx::query_as(&query)
            .bind(account.kind.as_str())
            .bind(&account.reference)
            .bind(filter.operation.map(|op| op.as_str()))
            .bind(filter.counterparty_kind.map(|kind| kind.as_str()))
            .bind(filter.more_than)
            .bind(filter.less_than)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(bill_from_row).collect()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
