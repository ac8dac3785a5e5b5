//! Domain identifier types with proper encapsulation.
//!
//! Every aggregate gets its own newtype over [`Uuid`] so ids cannot be
//! mixed up across entities. The inner value is private to ensure all
//! construction goes through the defined constructors.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Get the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id! {
    /// Identifies a user across personas (client, business owner, agent).
    UserId
}

uuid_id! {
    /// Identifies a balance account; one per (user, currency) pair.
    AccountId
}

uuid_id! {
    /// Identifies a ledger transaction row.
    TransactionId
}

uuid_id! {
    /// Identifies an order.
    OrderId
}

uuid_id! {
    /// Identifies an order hold.
    HoldId
}

uuid_id! {
    /// Identifies a delivery time slot template.
    SlotId
}

uuid_id! {
    /// Identifies a delivery time window booked against a slot.
    WindowId
}

uuid_id! {
    /// Identifies a business location; owned by the locations service.
    LocationId
}

uuid_id! {
    /// Identifies a delivery address; owned by the address book service.
    AddressId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_values() {
        let a = OrderId::new();
        let b = OrderId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_and_parse_round_trip() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<SlotId>().is_err());
    }
}
