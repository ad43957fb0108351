//! Broadcast payload definitions
//!
//! The `LocationUpdate` is the denormalized bundle pushed to subscribers
//! and returned to the ingesting caller — both see the exact same
//! payload instance, so no follow-up queries are needed on either side.

use serde::{Deserialize, Serialize};
use types::bus::BusSummary;
use types::location::LocationPoint;
use types::trip::TripSummary;

/// Denormalized location event: bus + position + trip/route context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub bus: BusSummary,
    pub location: LocationPoint,
    pub trip: TripSummary,
}

/// Wire envelope for a server-initiated push.
///
/// Shape: `{"event":"location-update","data":{...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct PushEnvelope<'a> {
    pub event: &'static str,
    pub data: &'a LocationUpdate,
}

impl LocationUpdate {
    /// Serialize this update as a `location-update` push frame.
    pub fn push_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(&PushEnvelope {
            event: "location-update",
            data: self,
        })
    }
}
