//! Ledger engine integration tests through the public API

use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use easycash_ledger::domain::{BillStatus, HistoryFilter, OperationType, PolicyConfig};
use easycash_ledger::ledger::{PayBillCommand, SplitBillCommand, TransferCommand};
use easycash_ledger::{AccountRef, LedgerEngine, LedgerError, Policy};

mod common;
use common::{ALICE, BANK, BOB, CAROL, MERCHANT};

#[tokio::test]
async fn test_custom_policy() {
    let policy = Policy::new(PolicyConfig {
        minimum_transaction: dec!(1000),
        top_up_fee: dec!(0),
        withdrawal_fee: dec!(500),
    })
    .unwrap();
    let store = common::memory_store().await;
    let engine = LedgerEngine::new(store.clone(), policy);

    assert_ok!(
        engine
            .transfer_between_users(TransferCommand::new(ALICE, BOB, dec!(1000)))
            .await
    );
    assert_ok!(
        engine
            .top_up_from_bank(TransferCommand::new(BANK, CAROL, dec!(1500)))
            .await
    );
    assert_ok!(
        engine
            .withdraw_to_bank(TransferCommand::new(BOB, BANK, dec!(1000)))
            .await
    );
    assert_err!(
        engine
            .transfer_between_users(TransferCommand::new(ALICE, BOB, dec!(999)))
            .await
    );

    assert_eq!(store.balance_of(&AccountRef::user(ALICE)).await, Some(dec!(99000)));
    assert_eq!(store.balance_of(&AccountRef::user(CAROL)).await, Some(dec!(1500)));
    assert_eq!(store.balance_of(&AccountRef::user(BOB)).await, Some(dec!(49500)));
}

#[tokio::test]
async fn test_top_up_fee_larger_than_amount() {
    let policy = Policy::new(PolicyConfig {
        minimum_transaction: dec!(100),
        top_up_fee: dec!(1000),
        withdrawal_fee: dec!(0),
    })
    .unwrap();
    let store = common::memory_store().await;
    let engine = LedgerEngine::new(store.clone(), policy);

    let err = engine
        .top_up_from_bank(TransferCommand::new(BANK, CAROL, dec!(1000)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::BelowMinimum { .. }));
    assert_eq!(store.units_begun(), 0);
}

#[tokio::test]
async fn test_money_is_conserved_across_mixed_operations() {
    let store = common::memory_store().await;
    let engine = Arc::new(LedgerEngine::new(store.clone(), Policy::default()));

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let command = if i % 2 == 0 {
                TransferCommand::new(ALICE, BOB, dec!(15000))
            } else {
                TransferCommand::new(BOB, ALICE, dec!(12000))
            };
            engine.transfer_between_users(command).await
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    let alice = store.balance_of(&AccountRef::user(ALICE)).await.unwrap();
    let bob = store.balance_of(&AccountRef::user(BOB)).await.unwrap();
    assert_eq!(alice + bob, dec!(150000));
    assert!(alice >= dec!(0));
    assert!(bob >= dec!(0));
    assert_eq!(store.units_abandoned() + store.units_committed(), 20);
}

#[tokio::test]
async fn test_concurrent_pay_bill_settles_once() {
    let store = common::memory_store().await;
    let engine = Arc::new(LedgerEngine::new(store.clone(), Policy::default()));

    let receipt = engine
        .split_bill(SplitBillCommand::new(ALICE, vec![BOB.to_string()], vec![dec!(20000)]))
        .await
        .unwrap();
    let transaction_id = receipt.shares[0].transaction_id.clone();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        let transaction_id = transaction_id.clone();
        handles.push(tokio::spawn(async move {
            engine.pay_bill(PayBillCommand::new(BOB, transaction_id)).await
        }));
    }

    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => paid += 1,
            Err(err) => assert!(matches!(err, LedgerError::BillAlreadyPaid(_))),
        }
    }

    assert_eq!(paid, 1);
    assert_eq!(store.balance_of(&AccountRef::user(BOB)).await, Some(dec!(30000)));
    assert_eq!(store.balance_of(&AccountRef::user(ALICE)).await, Some(dec!(120000)));
}

#[tokio::test]
async fn test_history_after_settlement() {
    let store = common::memory_store().await;
    let engine = LedgerEngine::new(store, Policy::default());

    engine
        .transfer_to_merchant(TransferCommand::new(ALICE, MERCHANT, dec!(25000)))
        .await
        .unwrap();
    let split = engine
        .split_bill(SplitBillCommand::new(ALICE, vec![CAROL.to_string()], vec![dec!(10000)]))
        .await
        .unwrap();

    let carol = AccountRef::user(CAROL);
    let history = engine.history(&carol, &HistoryFilter::new()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, BillStatus::Created);
    assert_eq!(history[0].transaction_id, split.shares[0].transaction_id);

    let merchant = AccountRef::merchant(MERCHANT);
    let history = engine
        .history(&merchant, &HistoryFilter::new().with_operation(OperationType::MerchantPayment))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender, AccountRef::user(ALICE));
}
