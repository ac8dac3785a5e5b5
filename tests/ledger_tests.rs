//! Tests for the ledger store: account lifecycle, balance movement,
//! and log/balance consistency.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use waybill::domain::{Currency, TransactionType, UserId};
use waybill::error::{Error, LedgerError};
use waybill::ledger::TransactionRequest;
use waybill::testkit::fixtures::{core, funded_account};

#[tokio::test]
async fn open_account_starts_empty_and_is_unique_per_currency() {
    let core = core();
    let user = UserId::new();

    let account = core
        .ledger()
        .open_account(user, Currency::xaf())
        .await
        .unwrap();
    let balances = core.ledger().balances(account.id).await.unwrap();
    assert_eq!(balances.available, dec!(0));
    assert_eq!(balances.withheld, dec!(0));

    let duplicate = core.ledger().open_account(user, Currency::xaf()).await;
    assert!(matches!(
        duplicate,
        Err(Error::Ledger(LedgerError::DuplicateAccount { .. }))
    ));

    // A different currency is a different account.
    assert!(core
        .ledger()
        .open_account(user, Currency::new("USD"))
        .await
        .is_ok());
}

#[tokio::test]
async fn deposit_and_withdrawal_move_available_balance() {
    let core = core();
    let account = funded_account(&core, dec!(500)).await;

    core.ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(120),
            TransactionType::Withdrawal,
        ))
        .await
        .unwrap();

    let balances = core.ledger().balances(account.id).await.unwrap();
    assert_eq!(balances.available, dec!(380));
    assert_eq!(balances.withheld, dec!(0));
}

#[tokio::test]
async fn overdraft_is_rejected_and_balances_untouched() {
    let core = core();
    let account = funded_account(&core, dec!(50)).await;

    let result = core
        .ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(80),
            TransactionType::Payment,
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InsufficientFunds { .. }))
    ));

    let balances = core.ledger().balances(account.id).await.unwrap();
    assert_eq!(balances.available, dec!(50));
    assert!(core
        .ledger()
        .transactions(account.id, 10, 0)
        .await
        .unwrap()
        .iter()
        .all(|tx| tx.transaction_type != TransactionType::Payment));
}

#[tokio::test]
async fn hold_requires_available_funds() {
    let core = core();
    let account = funded_account(&core, dec!(100)).await;

    let result = core
        .ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(101),
            TransactionType::Hold,
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InsufficientFunds { .. }))
    ));
}

#[tokio::test]
async fn release_requires_withheld_funds() {
    let core = core();
    let account = funded_account(&core, dec!(100)).await;

    let result = core
        .ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(1),
            TransactionType::Release,
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InsufficientFunds { .. }))
    ));
}

#[tokio::test]
async fn hold_then_release_restores_available_exactly() {
    let core = core();
    let account = funded_account(&core, dec!(250.75)).await;

    core.ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(110.25),
            TransactionType::Hold,
        ))
        .await
        .unwrap();
    let held = core.ledger().balances(account.id).await.unwrap();
    assert_eq!(held.available, dec!(140.50));
    assert_eq!(held.withheld, dec!(110.25));

    core.ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(110.25),
            TransactionType::Release,
        ))
        .await
        .unwrap();
    let released = core.ledger().balances(account.id).await.unwrap();
    assert_eq!(released.available, dec!(250.75));
    assert_eq!(released.withheld, dec!(0));
}

#[tokio::test]
async fn inactive_account_rejects_transactions() {
    let core = core();
    let account = funded_account(&core, dec!(100)).await;

    core.ledger().deactivate_account(account.id).await.unwrap();

    let result = core
        .ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(10),
            TransactionType::Deposit,
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::AccountInactive(_)))
    ));
}

#[tokio::test]
async fn zero_and_negative_amounts_are_rejected() {
    let core = core();
    let account = funded_account(&core, dec!(100)).await;

    for amount in [dec!(0), dec!(-5)] {
        let result = core
            .ledger()
            .record_transaction(TransactionRequest::new(
                account.id,
                amount,
                TransactionType::Deposit,
            ))
            .await;
        assert!(matches!(
            result,
            Err(Error::Ledger(LedgerError::NonPositiveAmount(_)))
        ));
    }

    // Adjustments are signed but must not be zero.
    assert!(core
        .ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(-30),
            TransactionType::Adjustment,
        ))
        .await
        .is_ok());
    let result = core
        .ledger()
        .record_transaction(TransactionRequest::new(
            account.id,
            dec!(0),
            TransactionType::Adjustment,
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::ZeroAdjustment))
    ));
}

/// Replaying the full transaction log reproduces the stored balances.
#[tokio::test]
async fn balances_equal_replayed_transaction_log() {
    let core = core();
    let account = funded_account(&core, dec!(1000)).await;

    for (amount, ty) in [
        (dec!(110), TransactionType::Hold),
        (dec!(40), TransactionType::Payment),
        (dec!(10), TransactionType::Release),
        (dec!(25), TransactionType::Fee),
        (dec!(60), TransactionType::Refund),
    ] {
        core.ledger()
            .record_transaction(TransactionRequest::new(account.id, amount, ty))
            .await
            .unwrap();
    }

    let log = core.ledger().transactions(account.id, 100, 0).await.unwrap();
    let (available, withheld) = log.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(available, withheld), tx| {
            let effect = tx.transaction_type.effect(tx.amount);
            (available + effect.available, withheld + effect.withheld)
        },
    );

    let balances = core.ledger().balances(account.id).await.unwrap();
    assert_eq!(balances.available, available);
    assert_eq!(balances.withheld, withheld);
    assert_eq!(balances.total(), available + withheld);
}

#[tokio::test]
async fn transaction_listing_is_paginated() {
    let core = core();
    let account = funded_account(&core, dec!(100)).await;

    for _ in 0..4 {
        core.ledger()
            .record_transaction(TransactionRequest::new(
                account.id,
                dec!(1),
                TransactionType::Deposit,
            ))
            .await
            .unwrap();
    }

    // 1 funding deposit + 4 more.
    let all = core.ledger().transactions(account.id, 100, 0).await.unwrap();
    assert_eq!(all.len(), 5);
    let page = core.ledger().transactions(account.id, 2, 1).await.unwrap();
    assert_eq!(page.len(), 2);
}
