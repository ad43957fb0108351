//! Live Tracking Service
//!
//! Consumes GPS location reports from buses on active trips and produces:
//! - Durable, append-only fix storage with per-bus and per-trip indexes
//! - Real-time fan-out to WebSocket subscribers with topic routing
//!   (per-bus, per-route, global) and bounded per-connection queues
//! - Read-side aggregation (latest fix per bus, nearby buses)
//!
//! # Architecture
//!
//! ```text
//! GPS reporter
//!      │
//!  ┌───▼────┐
//!  │ Ingest │  ← Validates, resolves the active trip
//!  └───┬────┘
//!      │
//!  ┌───▼────┐     ┌──────────┐
//!  │ Store  │────▶│ Journal  │  (append-only, checksummed)
//!  └───┬────┘     └──────────┘
//!      │
//!  ┌───▼────────────────────┐
//!  │ Fan-out Broker         │  bus:<n> / route:<id> / all
//!  └───┬──────┬──────┬──────┘
//!      ▼      ▼      ▼
//!   subscriber connections
//! ```
//!
//! The store write always completes before the broadcast is dispatched;
//! delivery to each connection is fire-and-forget with no ordering
//! guarantee across topics.

pub mod broker;
pub mod events;
pub mod ingest;
pub mod journal;
pub mod query;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod topic;
