//! Tests for the hold manager: placement, amendment, resolution, and
//! idempotency.

use rust_decimal_macros::dec;

use waybill::domain::{Currency, HoldOutcome, HoldStatus, OrderId};
use waybill::error::{Error, HoldError, LedgerError};
use waybill::ledger::{AgentPortion, HoldAdjustment, PlaceHold};
use waybill::testkit::fixtures::{core, funded_account};

fn place_request(order_id: OrderId, client_account: waybill::domain::AccountId) -> PlaceHold {
    PlaceHold {
        order_id,
        client_account_id: client_account,
        client_amount: dec!(110),
        agent: None,
        delivery_fees: dec!(10),
        currency: Currency::xaf(),
    }
}

#[tokio::test]
async fn placing_a_hold_moves_client_funds_to_withheld() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(place_request(order_id, client.id))
        .await
        .unwrap();
    assert_eq!(hold.status, HoldStatus::Active);
    assert_eq!(hold.client_hold_amount, dec!(110));

    let balances = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(balances.available, dec!(390));
    assert_eq!(balances.withheld, dec!(110));
}

#[tokio::test]
async fn a_second_active_hold_for_the_same_order_is_rejected() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let order_id = OrderId::new();

    core.holds()
        .place_hold(place_request(order_id, client.id))
        .await
        .unwrap();
    let result = core
        .holds()
        .place_hold(place_request(order_id, client.id))
        .await;
    assert!(matches!(result, Err(Error::Hold(HoldError::HoldExists(_)))));
}

#[tokio::test]
async fn placement_is_all_or_nothing_across_accounts() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    // Agent cannot cover the collateral.
    let agent = funded_account(&core, dec!(3)).await;
    let order_id = OrderId::new();

    let result = core
        .holds()
        .place_hold(PlaceHold {
            agent: Some(AgentPortion {
                account_id: agent.id,
                amount: dec!(10),
            }),
            ..place_request(order_id, client.id)
        })
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InsufficientFunds { .. }))
    ));

    // The client hold recorded before the failure was rolled back.
    let client_balances = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(client_balances.available, dec!(500));
    assert_eq!(client_balances.withheld, dec!(0));
    assert!(core
        .holds()
        .hold_for_order(order_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn amending_a_hold_attaches_the_agent_portion() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let agent = funded_account(&core, dec!(50)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(place_request(order_id, client.id))
        .await
        .unwrap();
    let amended = core
        .holds()
        .update_hold(
            hold.id,
            HoldAdjustment {
                client_amount: None,
                agent: Some(AgentPortion {
                    account_id: agent.id,
                    amount: dec!(10),
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(amended.agent_account_id, Some(agent.id));
    assert_eq!(amended.agent_hold_amount, dec!(10));
    let agent_balances = core.ledger().balances(agent.id).await.unwrap();
    assert_eq!(agent_balances.available, dec!(40));
    assert_eq!(agent_balances.withheld, dec!(10));
}

#[tokio::test]
async fn amendments_are_incremental_not_rebuilt() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(place_request(order_id, client.id))
        .await
        .unwrap();

    // Raise then lower the client amount; each step issues only the
    // delta, so withheld funds track the target exactly.
    core.holds()
        .update_hold(
            hold.id,
            HoldAdjustment {
                client_amount: Some(dec!(150)),
                agent: None,
            },
        )
        .await
        .unwrap();
    let raised = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(raised.withheld, dec!(150));

    core.holds()
        .update_hold(
            hold.id,
            HoldAdjustment {
                client_amount: Some(dec!(90)),
                agent: None,
            },
        )
        .await
        .unwrap();
    let lowered = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(lowered.withheld, dec!(90));
    assert_eq!(lowered.available, dec!(410));

    // hold 110 + hold 40 + release 60, plus the funding deposit.
    let log = core.ledger().transactions(client.id, 100, 0).await.unwrap();
    assert_eq!(log.len(), 4);
}

#[tokio::test]
async fn resolving_with_release_restores_both_parties() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let agent = funded_account(&core, dec!(50)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(PlaceHold {
            agent: Some(AgentPortion {
                account_id: agent.id,
                amount: dec!(10),
            }),
            ..place_request(order_id, client.id)
        })
        .await
        .unwrap();

    let resolved = core
        .holds()
        .resolve_hold(hold.id, HoldOutcome::Release)
        .await
        .unwrap();
    assert_eq!(resolved.status, HoldStatus::Cancelled);

    let client_balances = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(client_balances.available, dec!(500));
    assert_eq!(client_balances.withheld, dec!(0));
    let agent_balances = core.ledger().balances(agent.id).await.unwrap();
    assert_eq!(agent_balances.available, dec!(50));
    assert_eq!(agent_balances.withheld, dec!(0));
}

#[tokio::test]
async fn resolving_with_capture_charges_client_and_frees_agent() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let agent = funded_account(&core, dec!(50)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(PlaceHold {
            agent: Some(AgentPortion {
                account_id: agent.id,
                amount: dec!(10),
            }),
            ..place_request(order_id, client.id)
        })
        .await
        .unwrap();

    let resolved = core
        .holds()
        .resolve_hold(hold.id, HoldOutcome::Capture)
        .await
        .unwrap();
    assert_eq!(resolved.status, HoldStatus::Completed);

    let client_balances = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(client_balances.available, dec!(390));
    assert_eq!(client_balances.withheld, dec!(0));
    // The agent's collateral is returned; their payout is the
    // workflow's business, not the hold manager's.
    let agent_balances = core.ledger().balances(agent.id).await.unwrap();
    assert_eq!(agent_balances.available, dec!(50));
    assert_eq!(agent_balances.withheld, dec!(0));
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(place_request(order_id, client.id))
        .await
        .unwrap();
    core.holds()
        .resolve_hold(hold.id, HoldOutcome::Release)
        .await
        .unwrap();

    let log_before = core.ledger().transactions(client.id, 100, 0).await.unwrap();
    let again = core
        .holds()
        .resolve_hold(hold.id, HoldOutcome::Release)
        .await
        .unwrap();
    assert_eq!(again.status, HoldStatus::Cancelled);

    // Same balances, no second transaction pair.
    let log_after = core.ledger().transactions(client.id, 100, 0).await.unwrap();
    assert_eq!(log_before.len(), log_after.len());
    let balances = core.ledger().balances(client.id).await.unwrap();
    assert_eq!(balances.available, dec!(500));
}

#[tokio::test]
async fn amending_a_resolved_hold_is_rejected() {
    let core = core();
    let client = funded_account(&core, dec!(500)).await;
    let order_id = OrderId::new();

    let hold = core
        .holds()
        .place_hold(place_request(order_id, client.id))
        .await
        .unwrap();
    core.holds()
        .resolve_hold(hold.id, HoldOutcome::Capture)
        .await
        .unwrap();

    let result = core
        .holds()
        .update_hold(
            hold.id,
            HoldAdjustment {
                client_amount: Some(dec!(10)),
                agent: None,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(Error::Hold(HoldError::HoldResolved(_)))
    ));
}
