//! Orders, the status workflow graph, and the actors that drive it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{AddressId, Amount, Currency, LocationId, OrderId, SlotId, UserId};

/// Workflow status of an order.
///
/// The graph follows the marketplace flow: the business confirms and
/// prepares, any agent claims a ready order, the assigned agent carries
/// it to the customer, and the client acknowledges receipt. `Cancelled`
/// is reachable from every pre-delivery status, `Failed` marks a
/// delivery or payment failure, and `Refunded` closes out a delivered,
/// failed, or cancelled order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    AssignedToAgent,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Complete,
    Cancelled,
    Failed,
    Refunded,
}

impl OrderStatus {
    /// Every status, in workflow order.
    pub const ALL: [OrderStatus; 13] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::ReadyForPickup,
        Self::AssignedToAgent,
        Self::PickedUp,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Complete,
        Self::Cancelled,
        Self::Failed,
        Self::Refunded,
    ];

    /// No transition leaves a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Refunded)
    }

    /// Statuses from which the order can still be called off, releasing
    /// holds and the slot window.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Confirmed
                | Self::Preparing
                | Self::ReadyForPickup
                | Self::AssignedToAgent
                | Self::PickedUp
                | Self::InTransit
                | Self::OutForDelivery
        )
    }

    /// True once the order reached the customer; a booked delivery
    /// window may no longer be released past this point.
    #[must_use]
    pub fn is_delivery_success(&self) -> bool {
        matches!(self, Self::Delivered | Self::Complete)
    }

    /// Stable storage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::AssignedToAgent => "assigned_to_agent",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Persona a caller is acting under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Client,
    Business,
    Agent,
    System,
}

impl ActorRole {
    /// Stable storage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Business => "business",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "business" => Ok(Self::Business),
            "agent" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            other => Err(format!("unknown actor role: {other}")),
        }
    }
}

/// Verification tier of a delivery agent, controlling the collateral
/// percentage withheld when the agent takes an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTier {
    /// Platform-employed couriers; no collateral.
    Internal,
    /// Identity-verified independent agents.
    Verified,
    /// New or unverified agents; full collateral.
    Unverified,
}

/// Identity driving a transition. Upstream authentication has already
/// established the persona; the workflow only checks that the persona is
/// allowed to make the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Client { user_id: UserId },
    Business { user_id: UserId },
    Agent { user_id: UserId, tier: AgentTier },
    /// Trusted internal caller (payment callbacks, schedulers).
    System,
}

impl Actor {
    /// The persona this actor acts under.
    #[must_use]
    pub fn role(&self) -> ActorRole {
        match self {
            Self::Client { .. } => ActorRole::Client,
            Self::Business { .. } => ActorRole::Business,
            Self::Agent { .. } => ActorRole::Agent,
            Self::System => ActorRole::System,
        }
    }

    /// User identity, absent for the system actor.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Client { user_id } | Self::Business { user_id } | Self::Agent { user_id, .. } => {
                Some(*user_id)
            }
            Self::System => None,
        }
    }
}

/// Whether `role` may move an order from `from` to `to`.
///
/// The business drives confirmation and preparation and may cancel or
/// refund; the assigned agent drives the delivery leg; the client
/// acknowledges receipt and may back out while the order is still
/// pending. Claiming a ready order (`ReadyForPickup` →
/// `AssignedToAgent`) is open to any agent and additionally requires
/// workflow-level assignment handling. The system actor may take any
/// edge that some persona is allowed to take.
#[must_use]
pub fn transition_allowed(from: OrderStatus, to: OrderStatus, role: ActorRole) -> bool {
    use OrderStatus as S;

    if from.is_terminal() {
        return false;
    }
    if role == ActorRole::System {
        return [ActorRole::Client, ActorRole::Business, ActorRole::Agent]
            .iter()
            .any(|r| transition_allowed(from, to, *r));
    }

    match role {
        ActorRole::Business => match (from, to) {
            (S::Pending, S::Confirmed)
            | (S::Pending, S::Failed)
            | (S::Confirmed, S::Preparing)
            | (S::Preparing, S::ReadyForPickup) => true,
            (_, S::Cancelled) => from.is_cancellable(),
            (S::Delivered | S::Failed | S::Cancelled, S::Refunded) => true,
            _ => false,
        },
        ActorRole::Agent => matches!(
            (from, to),
            (S::ReadyForPickup, S::AssignedToAgent)
                | (S::AssignedToAgent, S::PickedUp)
                | (S::PickedUp, S::InTransit)
                | (S::PickedUp, S::OutForDelivery)
                | (S::InTransit, S::OutForDelivery)
                | (S::OutForDelivery, S::Delivered)
                | (S::OutForDelivery, S::Failed)
        ),
        ActorRole::Client => matches!(
            (from, to),
            (S::Pending, S::Cancelled) | (S::Delivered, S::Complete)
        ),
        ActorRole::System => unreachable!("handled above"),
    }
}

/// Point on the map attached to a status change (courier position at
/// pickup or drop-off).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// A delivery window requested at submission time. Capacity is only
/// consumed when the business confirms the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub slot_id: SlotId,
    pub preferred_date: NaiveDate,
}

/// An order as the fulfillment core sees it. Catalog contents, item
/// lines, and addresses live with their own services; the core keeps the
/// monetary breakdown and the workflow state.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub client_id: UserId,
    pub business_id: UserId,
    pub business_location_id: LocationId,
    pub delivery_address_id: AddressId,
    pub assigned_agent_id: Option<UserId>,
    pub subtotal: Amount,
    pub base_delivery_fee: Amount,
    pub per_km_delivery_fee: Amount,
    pub tax_amount: Amount,
    pub total_amount: Amount,
    pub currency: Currency,
    pub current_status: OrderStatus,
    pub previous_status: Option<OrderStatus>,
    pub requested_window: Option<WindowRequest>,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Combined delivery fee portion of the total (base + per-km).
    #[must_use]
    pub fn delivery_fees(&self) -> Amount {
        self.base_delivery_fee + self.per_km_delivery_fee
    }
}

/// Input for submitting a new order. Line totals arrive pre-validated
/// from the catalog layer; the core re-checks only the breakdown sum.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub client_id: UserId,
    pub business_id: UserId,
    pub business_location_id: LocationId,
    pub delivery_address_id: AddressId,
    pub subtotal: Amount,
    pub base_delivery_fee: Amount,
    pub per_km_delivery_fee: Amount,
    pub tax_amount: Amount,
    pub total_amount: Amount,
    pub currency: Currency,
    pub requested_window: Option<WindowRequest>,
    pub special_instructions: Option<String>,
}

impl OrderDraft {
    /// Sum of the breakdown components, which must match `total_amount`
    /// within the currency's rounding tolerance.
    #[must_use]
    pub fn breakdown_sum(&self) -> Amount {
        self.subtotal + self.base_delivery_fee + self.per_km_delivery_fee + self.tax_amount
    }
}

/// One row of the append-only status audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusHistoryEntry {
    pub order_id: OrderId,
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by_role: ActorRole,
    pub changed_by_user_id: Option<UserId>,
    pub location: Option<Geolocation>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Process-wide order-number sequence: date prefix plus a monotonic
/// counter, e.g. `WB-20260807-00042`.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    sequence: Mutex<u64>,
}

impl OrderNumberGenerator {
    /// Create a generator starting at sequence 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next order number.
    pub fn next_number(&self) -> String {
        let mut seq = self.sequence.lock();
        *seq += 1;
        format!("WB-{}-{:05}", Utc::now().format("%Y%m%d"), *seq)
    }
}
