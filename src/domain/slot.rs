//! Delivery time slots and the windows booked against them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, SlotId, UserId, WindowId};

/// Delivery speed class of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Standard,
    Fast,
}

impl SlotType {
    /// Stable storage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "fast" => Ok(Self::Fast),
            other => Err(format!("unknown slot type: {other}")),
        }
    }
}

/// Reusable delivery-time template for a location class. Reference
/// data; rarely mutated. The per-day booking ceiling is
/// `max_orders_per_slot`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryTimeSlot {
    pub id: SlotId,
    pub country_code: String,
    pub state: Option<String>,
    pub slot_name: String,
    pub slot_type: SlotType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_orders_per_slot: u32,
    pub is_active: bool,
    pub display_order: i32,
}

/// Input for defining a new slot template.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub country_code: String,
    pub state: Option<String>,
    pub slot_name: String,
    pub slot_type: SlotType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_orders_per_slot: u32,
    pub display_order: i32,
}

/// A specific order's booking against a slot template for a date.
///
/// Slot times are denormalized onto the window at reservation so the
/// booking survives later template edits. Released windows are flagged
/// cancelled rather than deleted and stop counting toward capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryTimeWindow {
    pub id: WindowId,
    pub order_id: OrderId,
    pub slot_id: SlotId,
    pub preferred_date: NaiveDate,
    pub time_slot_start: NaiveTime,
    pub time_slot_end: NaiveTime,
    pub is_confirmed: bool,
    pub is_cancelled: bool,
    pub confirmed_by: Option<UserId>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Capacity report for one (slot, date) aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCapacity {
    pub slot_id: SlotId,
    pub date: NaiveDate,
    pub total_capacity: u32,
    pub booked_count: u32,
}

impl SlotCapacity {
    /// Units still open for booking.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.total_capacity.saturating_sub(self.booked_count)
    }

    /// True while at least one unit remains.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.available() > 0
    }
}

/// A slot joined with its remaining capacity and bookability for a
/// specific date, as returned to slot pickers.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableSlot {
    pub slot: DeliveryTimeSlot,
    pub available_capacity: u32,
    /// Capacity remains and the slot start satisfies the minimum
    /// booking lead time.
    pub is_available: bool,
}
