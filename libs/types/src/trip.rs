//! Trip scheduling and lifecycle types
//!
//! A trip binds exactly one bus to exactly one route for a scheduled run.
//! Core consistency invariant: at most one trip per bus may be
//! `in_progress` at any time — active-trip resolution relies on it.

use crate::ids::{BusId, RouteId, TripId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Travel direction along the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

/// Trip lifecycle status
///
/// Normal progression is scheduled → in_progress → completed; a trip may
/// instead be cancelled from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Whether `next` is a legal transition from this status
    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        matches!(
            (self, next),
            (TripStatus::Scheduled, TripStatus::InProgress)
                | (TripStatus::Scheduled, TripStatus::Cancelled)
                | (TripStatus::InProgress, TripStatus::Completed)
                | (TripStatus::InProgress, TripStatus::Cancelled)
        )
    }
}

impl Default for TripStatus {
    fn default() -> Self {
        TripStatus::Scheduled
    }
}

/// A scheduled run of one bus along one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    /// Unique trip number, e.g. "TRIP-001"
    pub trip_number: String,
    pub bus: BusId,
    pub route: RouteId,
    pub direction: Direction,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    #[serde(default)]
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

/// Denormalized trip context embedded in broadcast payloads.
///
/// Carries the route summary inline so subscribers need no follow-up
/// queries; `route` is None when the trip's route could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub id: TripId,
    pub trip_number: String,
    pub direction: Direction,
    pub status: TripStatus,
    pub route: Option<crate::route::RouteSummary>,
}
