//! GPS fix types
//!
//! A fix is one GPS sample from a bus on an active trip. Fixes are
//! immutable once created and the store is append-only; duplicates are
//! not deduplicated.

use crate::ids::{BusId, FixId, TripId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted GPS sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub id: FixId,
    pub bus: BusId,
    /// Trip that was active at capture time; None only for rows written
    /// before trip attribution existed (the ingest path always sets it).
    pub trip: Option<TripId>,
    pub latitude: f64,
    pub longitude: f64,
    /// Speed in km/h, never negative
    pub speed: f64,
    /// Compass heading in degrees [0, 360]
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
}

/// The position fields of a fix as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&LocationFix> for LocationPoint {
    fn from(fix: &LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed: fix.speed,
            heading: fix.heading,
            timestamp: fix.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_serde_roundtrip() {
        let fix = LocationFix {
            id: FixId::new(),
            bus: BusId::new(),
            trip: Some(TripId::new()),
            latitude: 6.9271,
            longitude: 79.8612,
            speed: 45.0,
            heading: 0.0,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&fix).unwrap();
        let back: LocationFix = serde_json::from_str(&json).unwrap();
        assert_eq!(fix, back);
    }

    #[test]
    fn test_point_from_fix() {
        let fix = LocationFix {
            id: FixId::new(),
            bus: BusId::new(),
            trip: None,
            latitude: 7.2906,
            longitude: 80.6337,
            speed: 0.0,
            heading: 180.0,
            timestamp: Utc::now(),
        };
        let point = LocationPoint::from(&fix);
        assert_eq!(point.latitude, 7.2906);
        assert_eq!(point.heading, 180.0);
    }
}
