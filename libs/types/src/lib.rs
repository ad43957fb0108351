//! Types library for the bus fleet tracking system
//!
//! This library provides all core type definitions shared across the
//! tracking services: fleet vehicles, routes, trips, and GPS fixes.
//!
//! # Modules
//! - `ids`: Unique identifiers (BusId, RouteId, TripId, FixId)
//! - `bus`: Fleet vehicle types
//! - `route`: Route and waypoint types
//! - `trip`: Trip scheduling and lifecycle types
//! - `location`: GPS fix types

pub mod bus;
pub mod ids;
pub mod location;
pub mod route;
pub mod trip;
