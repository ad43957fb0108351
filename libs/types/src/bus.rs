//! Fleet vehicle types
//!
//! A `Bus` is a registered fleet vehicle. It is referenced — never owned —
//! by trips and location fixes.

use crate::ids::BusId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator running the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// State-run transport board
    #[serde(rename = "SLTB")]
    Sltb,
    Private,
}

/// Service class of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    Normal,
    #[serde(rename = "Semi-Luxury")]
    SemiLuxury,
    #[serde(rename = "AC")]
    Ac,
    Luxury,
}

/// Operational status of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Active,
    Inactive,
    Maintenance,
}

impl Default for BusStatus {
    fn default() -> Self {
        BusStatus::Active
    }
}

/// Seated and standing capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub seated: u32,
    #[serde(default)]
    pub standing: u32,
}

/// A registered fleet vehicle
///
/// `bus_number` and `registration_number` are unique across the fleet and
/// stored uppercased; the registry enforces both constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: BusId,
    /// Human-readable fleet number, e.g. "NB-1001"
    pub bus_number: String,
    /// Vehicle registration plate
    pub registration_number: String,
    pub operator: Operator,
    pub service_type: ServiceType,
    pub capacity: Capacity,
    #[serde(default)]
    pub status: BusStatus,
    pub created_at: DateTime<Utc>,
}

/// Denormalized bus context embedded in broadcast payloads so subscribers
/// need no follow-up queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSummary {
    pub id: BusId,
    pub bus_number: String,
    pub registration_number: String,
    pub service_type: ServiceType,
    pub operator: Operator,
}

impl From<&Bus> for BusSummary {
    fn from(bus: &Bus) -> Self {
        Self {
            id: bus.id,
            bus_number: bus.bus_number.clone(),
            registration_number: bus.registration_number.clone(),
            service_type: bus.service_type,
            operator: bus.operator,
        }
    }
}
