//! Unique identifier types for fleet tracking entities
//!
//! All IDs use UUID v7 for time-sortable ordering, enabling efficient
//! chronological queries over trips and location fixes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new identifier with the current timestamp
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
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
                Ok(Self(Uuid::from_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a fleet vehicle
    ///
    /// Uses UUID v7 for time-based sorting. Buses can be addressed by this
    /// id or by their human-readable bus number; the registry maintains
    /// both lookups.
    BusId
}

uuid_id! {
    /// Unique identifier for a route
    ///
    /// Also serves as the suffix of `route:<id>` broadcast topics.
    RouteId
}

uuid_id! {
    /// Unique identifier for a trip
    TripId
}

uuid_id! {
    /// Unique identifier for a single GPS fix
    ///
    /// UUID v7 ordering matches insertion order within a device's clock
    /// resolution, which keeps fix ids roughly chronological.
    FixId
}
