//! Food Alerts - proximity alerting for food-safety incident reports
//!
//! When a new report is committed, subscribers registered within a radius
//! of its location are notified by email and/or SMS. The same matching
//! backs a "what's near me" query and a periodic reconciliation sweep.

pub mod bootstrap;
pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use crate::core::{
    haversine_distance, parse_location, AlertTrigger, NotificationDispatcher, ProximityMatcher,
};
pub use models::{Coordinate, DispatchOutcome, Report, ReportEvent, Subscription};
