//! Common test utilities

#![allow(dead_code)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use easycash_ledger::store::MemoryLedgerStore;
use easycash_ledger::AccountRef;

pub const ALICE: &str = "081200000001";
pub const BOB: &str = "081200000002";
pub const CAROL: &str = "081200000003";
pub const MERCHANT: &str = "MRC-TOKO-01";
pub const BANK: &str = "BNI";

/// Accounts every test starts from
pub fn seed_accounts() -> Vec<(AccountRef, Decimal)> {
    vec![
        (AccountRef::user(ALICE), dec!(100000)),
        (AccountRef::user(BOB), dec!(50000)),
        (AccountRef::user(CAROL), dec!(0)),
        (AccountRef::merchant(MERCHANT), dec!(0)),
        (AccountRef::bank(BANK), dec!(5000000)),
    ]
}

/// In-memory store seeded with `seed_accounts`
pub async fn memory_store() -> MemoryLedgerStore {
    let store = MemoryLedgerStore::new();
    for (account, balance) in seed_accounts() {
        store.open_account(account, balance).await;
    }
    store
}

/// Setup test database - apply the schema, truncate tables and seed accounts
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    easycash_ledger::db::apply_schema(&pool)
        .await
        .expect("Failed to apply schema");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    sqlx::query("TRUNCATE TABLE bills, accounts RESTART IDENTITY CASCADE")
        .execute(&mut *tx)
        .await
        .expect("Failed to clean up DB");

    for (account, balance) in seed_accounts() {
        sqlx::query("INSERT INTO accounts (kind, reference, balance) VALUES ($1, $2, $3)")
            .bind(account.kind.as_str())
            .bind(&account.reference)
            .bind(balance)
            .execute(&mut *tx)
            .await
            .expect("Failed to seed account");
    }

    tx.commit().await.expect("Failed to commit transaction");

    pool
}

/// Committed balance read straight from the database
pub async fn db_balance(pool: &PgPool, account: &AccountRef) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE kind = $1 AND reference = $2")
        .bind(account.kind.as_str())
        .bind(&account.reference)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}
