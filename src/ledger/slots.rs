//! Slot booking manager: finite-capacity delivery windows.
//!
//! The count-then-insert reservation runs inside an immediate storage
//! transaction, so two concurrent reservations for the last unit of a
//! (slot, date) aggregate serialize: exactly one inserts, the other
//! observes the full count and fails with `SlotFull` without writing.

use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use diesel::prelude::*;
use tracing::info;

use crate::config::SlotsConfig;
use crate::db::model::{parse_field, SlotRow, WindowRow};
use crate::db::schema::{delivery_time_slots, delivery_time_windows, orders};
use crate::db::{self, DbPool};
use crate::domain::{
    AvailableSlot, DeliveryTimeSlot, DeliveryTimeWindow, NewSlot, OrderId, OrderStatus, SlotCapacity,
    SlotId, SlotType, UserId, WindowId,
};
use crate::error::{Result, SlotError};

/// Public slot booking API over the connection pool.
pub struct SlotBooking {
    pool: DbPool,
    config: SlotsConfig,
}

impl SlotBooking {
    pub(crate) fn new(pool: DbPool, config: SlotsConfig) -> Self {
        Self { pool, config }
    }

    /// Define a new slot template. Reference data, seeded by operators.
    pub async fn define_slot(&self, new_slot: NewSlot) -> Result<DeliveryTimeSlot> {
        let slot = DeliveryTimeSlot {
            id: SlotId::new(),
            country_code: new_slot.country_code,
            state: new_slot.state,
            slot_name: new_slot.slot_name,
            slot_type: new_slot.slot_type,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            max_orders_per_slot: new_slot.max_orders_per_slot,
            is_active: true,
            display_order: new_slot.display_order,
        };
        let row = SlotRow::from_domain(&slot);
        db::write_tx(&self.pool, move |conn| {
            diesel::insert_into(delivery_time_slots::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        Ok(slot)
    }

    /// Toggle a slot template's availability for new reservations.
    pub async fn set_slot_active(&self, slot_id: SlotId, is_active: bool) -> Result<DeliveryTimeSlot> {
        db::write_tx(&self.pool, move |conn| {
            let mut slot = load_slot(conn, slot_id)?;
            if slot.is_active != is_active {
                slot.is_active = is_active;
                diesel::update(delivery_time_slots::table.find(slot_id.to_string()))
                    .set(delivery_time_slots::is_active.eq(is_active))
                    .execute(conn)?;
            }
            Ok(slot)
        })
        .await
    }

    /// Reserve one capacity unit of a slot for an order on a date.
    pub async fn reserve_slot(
        &self,
        slot_id: SlotId,
        date: NaiveDate,
        order_id: OrderId,
    ) -> Result<DeliveryTimeWindow> {
        db::write_tx(&self.pool, move |conn| {
            reserve(conn, slot_id, date, order_id, None)
        })
        .await
    }

    /// Confirm a reserved window. Capacity was already counted at
    /// reservation time, so no re-check happens here.
    pub async fn confirm_window(
        &self,
        window_id: WindowId,
        confirming_user: UserId,
    ) -> Result<DeliveryTimeWindow> {
        db::write_tx(&self.pool, move |conn| {
            let mut window = load_window(conn, window_id)?;
            if window.is_cancelled {
                return Err(SlotError::WindowCancelled(window_id).into());
            }
            if window.is_confirmed {
                return Ok(window);
            }
            window.is_confirmed = true;
            window.confirmed_by = Some(confirming_user);
            window.confirmed_at = Some(Utc::now());
            window.updated_at = window.confirmed_at.unwrap_or(window.updated_at);
            diesel::update(delivery_time_windows::table.find(window_id.to_string()))
                .set((
                    delivery_time_windows::is_confirmed.eq(true),
                    delivery_time_windows::confirmed_by.eq(confirming_user.to_string()),
                    delivery_time_windows::confirmed_at
                        .eq(window.confirmed_at.map(|at| at.to_rfc3339())),
                    delivery_time_windows::updated_at.eq(window.updated_at.to_rfc3339()),
                ))
                .execute(conn)?;
            info!(window_id = %window_id, "delivery window confirmed");
            Ok(window)
        })
        .await
    }

    /// Release a window so it stops counting toward capacity. Rejected
    /// once the owning order has reached the customer.
    pub async fn release_window(&self, window_id: WindowId) -> Result<DeliveryTimeWindow> {
        db::write_tx(&self.pool, move |conn| release(conn, window_id)).await
    }

    /// Capacity report for one (slot, date) pair.
    pub async fn capacity(&self, slot_id: SlotId, date: NaiveDate) -> Result<SlotCapacity> {
        db::read_only(&self.pool, move |conn| {
            let slot = load_slot(conn, slot_id)?;
            let booked = booked_count(conn, slot_id, date)?;
            Ok(SlotCapacity {
                slot_id,
                date,
                total_capacity: slot.max_orders_per_slot,
                booked_count: booked,
            })
        })
        .await
    }

    /// Active slots of the requested speed class for a location, with
    /// remaining capacity and lead-time bookability for `date`.
    pub async fn available_slots(
        &self,
        country_code: &str,
        state: Option<&str>,
        date: NaiveDate,
        fast: bool,
    ) -> Result<Vec<AvailableSlot>> {
        let slot_type = if fast { SlotType::Fast } else { SlotType::Standard };
        let config = self.config.clone();
        let country_code = country_code.to_string();
        let state = state.map(|s| s.to_string());
        db::read_only(&self.pool, move |conn| {
            let mut query = delivery_time_slots::table
                .filter(delivery_time_slots::country_code.eq(country_code))
                .filter(delivery_time_slots::slot_type.eq(slot_type.as_str()))
                .filter(delivery_time_slots::is_active.eq(true))
                .order(delivery_time_slots::display_order.asc())
                .into_boxed();
            if let Some(state) = state {
                query = query.filter(delivery_time_slots::state.eq(state));
            }
            let rows: Vec<SlotRow> = query.load(conn)?;

            let mut available = Vec::with_capacity(rows.len());
            for row in &rows {
                let slot = row.to_domain()?;
                let booked = booked_count(conn, slot.id, date)?;
                let capacity = SlotCapacity {
                    slot_id: slot.id,
                    date,
                    total_capacity: slot.max_orders_per_slot,
                    booked_count: booked,
                };
                let bookable = slot_is_bookable(&slot, date, &config);
                available.push(AvailableSlot {
                    available_capacity: capacity.available(),
                    is_available: capacity.has_room() && bookable,
                    slot,
                });
            }
            Ok(available)
        })
        .await
    }

    /// Look up the live (non-cancelled) window booked for an order.
    pub async fn window_for_order(&self, order_id: OrderId) -> Result<Option<DeliveryTimeWindow>> {
        db::read_only(&self.pool, move |conn| find_for_order(conn, order_id)).await
    }
}

/// A slot is bookable when its start on `date` is at least the
/// configured lead time away, evaluated in the marketplace's local
/// timezone.
fn slot_is_bookable(slot: &DeliveryTimeSlot, date: NaiveDate, config: &SlotsConfig) -> bool {
    let Some(offset) = FixedOffset::east_opt(config.utc_offset_minutes * 60) else {
        return false;
    };
    let local_start = date.and_time(slot.start_time);
    let Some(start_utc) = offset
        .from_local_datetime(&local_start)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
    else {
        return false;
    };
    start_utc >= Utc::now() + Duration::minutes(config.min_lead_minutes)
}

pub(crate) fn load_slot(conn: &mut SqliteConnection, slot_id: SlotId) -> Result<DeliveryTimeSlot> {
    let row: Option<SlotRow> = delivery_time_slots::table
        .find(slot_id.to_string())
        .first(conn)
        .optional()?;
    row.ok_or_else(|| SlotError::SlotNotFound(slot_id).into())
        .and_then(|row| row.to_domain())
}

pub(crate) fn load_window(
    conn: &mut SqliteConnection,
    window_id: WindowId,
) -> Result<DeliveryTimeWindow> {
    let row: Option<WindowRow> = delivery_time_windows::table
        .find(window_id.to_string())
        .first(conn)
        .optional()?;
    row.ok_or_else(|| SlotError::WindowNotFound(window_id).into())
        .and_then(|row| row.to_domain())
}

pub(crate) fn find_for_order(
    conn: &mut SqliteConnection,
    order_id: OrderId,
) -> Result<Option<DeliveryTimeWindow>> {
    let row: Option<WindowRow> = delivery_time_windows::table
        .filter(delivery_time_windows::order_id.eq(order_id.to_string()))
        .filter(delivery_time_windows::is_cancelled.eq(false))
        .first(conn)
        .optional()?;
    row.map(|row| row.to_domain()).transpose()
}

fn booked_count(conn: &mut SqliteConnection, slot_id: SlotId, date: NaiveDate) -> Result<u32> {
    let count: i64 = delivery_time_windows::table
        .filter(delivery_time_windows::slot_id.eq(slot_id.to_string()))
        .filter(delivery_time_windows::preferred_date.eq(date.format("%Y-%m-%d").to_string()))
        .filter(delivery_time_windows::is_cancelled.eq(false))
        .count()
        .get_result(conn)?;
    Ok(count.max(0) as u32)
}

/// Count-then-insert under the write lock held by the enclosing
/// immediate transaction; the ceiling can never be overshot.
pub(crate) fn reserve(
    conn: &mut SqliteConnection,
    slot_id: SlotId,
    date: NaiveDate,
    order_id: OrderId,
    instructions: Option<String>,
) -> Result<DeliveryTimeWindow> {
    let slot = load_slot(conn, slot_id)?;
    if !slot.is_active {
        return Err(SlotError::SlotInactive(slot_id).into());
    }
    if find_for_order(conn, order_id)?.is_some() {
        return Err(SlotError::WindowExists(order_id).into());
    }

    let booked = booked_count(conn, slot_id, date)?;
    if booked >= slot.max_orders_per_slot {
        return Err(SlotError::SlotFull { slot_id, date }.into());
    }

    let now = Utc::now();
    let window = DeliveryTimeWindow {
        id: WindowId::new(),
        order_id,
        slot_id,
        preferred_date: date,
        time_slot_start: slot.start_time,
        time_slot_end: slot.end_time,
        is_confirmed: false,
        is_cancelled: false,
        confirmed_by: None,
        confirmed_at: None,
        special_instructions: instructions,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(delivery_time_windows::table)
        .values(WindowRow::from_domain(&window))
        .execute(conn)?;

    info!(
        slot_id = %slot_id,
        date = %date,
        order_id = %order_id,
        booked = booked + 1,
        capacity = slot.max_orders_per_slot,
        "delivery window reserved"
    );
    Ok(window)
}

/// Flag a window cancelled so it no longer counts toward capacity.
/// Idempotent; refuses once the owning order has been delivered.
pub(crate) fn release(conn: &mut SqliteConnection, window_id: WindowId) -> Result<DeliveryTimeWindow> {
    let mut window = load_window(conn, window_id)?;
    if window.is_cancelled {
        return Ok(window);
    }

    let status_text: Option<String> = orders::table
        .find(window.order_id.to_string())
        .select(orders::current_status)
        .first(conn)
        .optional()?;
    if let Some(status_text) = status_text {
        let status: OrderStatus = parse_field(&status_text, "orders.current_status")?;
        if status.is_delivery_success() {
            return Err(SlotError::WindowLocked { window_id, status }.into());
        }
    }

    window.is_cancelled = true;
    window.updated_at = Utc::now();
    diesel::update(delivery_time_windows::table.find(window_id.to_string()))
        .set((
            delivery_time_windows::is_cancelled.eq(true),
            delivery_time_windows::updated_at.eq(window.updated_at.to_rfc3339()),
        ))
        .execute(conn)?;

    info!(window_id = %window_id, order_id = %window.order_id, "delivery window released");
    Ok(window)
}
