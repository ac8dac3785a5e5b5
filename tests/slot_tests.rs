//! Tests for slot booking: capacity ceilings, release semantics, and
//! the last-seat race under real concurrency.

use std::sync::Arc;

use chrono::NaiveDate;

use waybill::config::Config;
use waybill::domain::{OrderId, UserId};
use waybill::error::{Error, SlotError};
use waybill::ledger::Fulfillment;
use waybill::testkit::db::TempDb;
use waybill::testkit::fixtures::{core, future_date, standard_slot};

#[tokio::test]
async fn reservations_stop_at_the_capacity_ceiling() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(2)).await.unwrap();
    let date = future_date();

    core.slots()
        .reserve_slot(slot.id, date, OrderId::new())
        .await
        .unwrap();
    core.slots()
        .reserve_slot(slot.id, date, OrderId::new())
        .await
        .unwrap();

    let result = core.slots().reserve_slot(slot.id, date, OrderId::new()).await;
    assert!(matches!(result, Err(Error::Slot(SlotError::SlotFull { .. }))));

    let capacity = core.slots().capacity(slot.id, date).await.unwrap();
    assert_eq!(capacity.booked_count, 2);
    assert_eq!(capacity.available(), 0);
}

#[tokio::test]
async fn capacity_is_per_date() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(1)).await.unwrap();

    core.slots()
        .reserve_slot(slot.id, future_date(), OrderId::new())
        .await
        .unwrap();

    // The next day is a separate aggregate.
    let other_date = NaiveDate::from_ymd_opt(2030, 6, 16).unwrap();
    assert!(core
        .slots()
        .reserve_slot(slot.id, other_date, OrderId::new())
        .await
        .is_ok());
}

#[tokio::test]
async fn releasing_a_window_frees_its_capacity_unit() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(1)).await.unwrap();
    let date = future_date();

    let window = core
        .slots()
        .reserve_slot(slot.id, date, OrderId::new())
        .await
        .unwrap();
    assert!(matches!(
        core.slots().reserve_slot(slot.id, date, OrderId::new()).await,
        Err(Error::Slot(SlotError::SlotFull { .. }))
    ));

    let released = core.slots().release_window(window.id).await.unwrap();
    assert!(released.is_cancelled);

    // Releasing again is a no-op, and the unit is bookable again.
    assert!(core.slots().release_window(window.id).await.is_ok());
    assert!(core
        .slots()
        .reserve_slot(slot.id, date, OrderId::new())
        .await
        .is_ok());
}

#[tokio::test]
async fn confirmation_stamps_the_window_and_is_idempotent() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(1)).await.unwrap();
    let confirmer = UserId::new();

    let window = core
        .slots()
        .reserve_slot(slot.id, future_date(), OrderId::new())
        .await
        .unwrap();
    assert!(!window.is_confirmed);

    let confirmed = core
        .slots()
        .confirm_window(window.id, confirmer)
        .await
        .unwrap();
    assert!(confirmed.is_confirmed);
    assert_eq!(confirmed.confirmed_by, Some(confirmer));
    assert!(confirmed.confirmed_at.is_some());

    let again = core
        .slots()
        .confirm_window(window.id, UserId::new())
        .await
        .unwrap();
    assert_eq!(again.confirmed_by, Some(confirmer));
}

#[tokio::test]
async fn cancelled_windows_cannot_be_confirmed() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(1)).await.unwrap();

    let window = core
        .slots()
        .reserve_slot(slot.id, future_date(), OrderId::new())
        .await
        .unwrap();
    core.slots().release_window(window.id).await.unwrap();

    let result = core.slots().confirm_window(window.id, UserId::new()).await;
    assert!(matches!(
        result,
        Err(Error::Slot(SlotError::WindowCancelled(_)))
    ));
}

#[tokio::test]
async fn an_order_gets_at_most_one_live_window() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(5)).await.unwrap();
    let order_id = OrderId::new();

    core.slots()
        .reserve_slot(slot.id, future_date(), order_id)
        .await
        .unwrap();
    let result = core.slots().reserve_slot(slot.id, future_date(), order_id).await;
    assert!(matches!(
        result,
        Err(Error::Slot(SlotError::WindowExists(_)))
    ));
}

#[tokio::test]
async fn inactive_slots_reject_reservations() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(3)).await.unwrap();
    core.slots().set_slot_active(slot.id, false).await.unwrap();

    let result = core
        .slots()
        .reserve_slot(slot.id, future_date(), OrderId::new())
        .await;
    assert!(matches!(
        result,
        Err(Error::Slot(SlotError::SlotInactive(_)))
    ));
}

#[tokio::test]
async fn availability_reports_capacity_and_lead_time() {
    let core = core();
    let slot = core.slots().define_slot(standard_slot(2)).await.unwrap();
    core.slots()
        .reserve_slot(slot.id, future_date(), OrderId::new())
        .await
        .unwrap();

    let listed = core
        .slots()
        .available_slots("GA", Some("Estuaire"), future_date(), false)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].available_capacity, 1);
    assert!(listed[0].is_available);

    // A date in the past can never satisfy the booking lead time.
    let past = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let listed = core
        .slots()
        .available_slots("GA", Some("Estuaire"), past, false)
        .await
        .unwrap();
    assert!(!listed[0].is_available);
    assert_eq!(listed[0].available_capacity, 2);

    // Fast slots are a separate class.
    let fast = core
        .slots()
        .available_slots("GA", Some("Estuaire"), future_date(), true)
        .await
        .unwrap();
    assert!(fast.is_empty());
}

/// The last-seat race: N tasks race for a single remaining unit over
/// separate pooled connections; exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_overshoot_capacity() {
    let db = TempDb::new();
    let core = Arc::new(Fulfillment::with_pool(db.pool(8), Config::default()));
    let slot = core.slots().define_slot(standard_slot(1)).await.unwrap();
    let date = future_date();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let core = Arc::clone(&core);
        handles.push(tokio::spawn(async move {
            core.slots().reserve_slot(slot.id, date, OrderId::new()).await
        }));
    }

    let mut won = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(Error::Slot(SlotError::SlotFull { .. })) => full += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(full, 7);

    let capacity = core.slots().capacity(slot.id, date).await.unwrap();
    assert_eq!(capacity.booked_count, 1);
}
