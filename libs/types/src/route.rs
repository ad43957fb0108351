//! Route and waypoint types
//!
//! A route owns its ordered waypoint sequence and is immutable while a
//! trip executes on it. Waypoints are stored but not used to validate
//! fixes (no geofencing).

use crate::ids::RouteId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named stop along a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Scheduled stop duration in seconds
    #[serde(default = "default_stop_duration")]
    pub stop_duration: u32,
    pub sequence_number: u32,
}

fn default_stop_duration() -> u32 {
    120
}

/// A bus route with its ordered waypoint sequence
///
/// `route_number` is unique across all routes and stored uppercased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    /// Public route number, e.g. "R001"
    pub route_number: String,
    pub name: String,
    pub origin: String,
    pub destination: String,
    /// Total route length in kilometers
    pub distance: f64,
    /// Estimated end-to-end duration in minutes
    pub estimated_duration: u32,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    pub created_at: DateTime<Utc>,
}

/// Denormalized route context embedded in broadcast payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: RouteId,
    pub route_number: String,
    pub name: String,
    pub origin: String,
    pub destination: String,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            id: route.id,
            route_number: route.route_number.clone(),
            name: route.name.clone(),
            origin: route.origin.clone(),
            destination: route.destination.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waypoint_default_stop_duration() {
        let json =
            r#"{"name":"Kadawatha","latitude":7.0012,"longitude":79.9509,"sequenceNumber":2}"#;
        let wp: Waypoint = serde_json::from_str(json).unwrap();
        assert_eq!(wp.stop_duration, 120);
    }

    #[test]
    fn test_summary_from_route() {
        let route = Route {
            id: RouteId::new(),
            route_number: "R001".to_string(),
            name: "Colombo - Kandy".to_string(),
            origin: "Colombo".to_string(),
            destination: "Kandy".to_string(),
            distance: 115.0,
            estimated_duration: 210,
            waypoints: vec![],
            created_at: Utc::now(),
        };
        let summary = RouteSummary::from(&route);
        assert_eq!(summary.route_number, "R001");
        assert_eq!(summary.destination, "Kandy");
    }
}
