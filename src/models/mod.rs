// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Coordinate, SeverityLevel, Symptom, Tag, Report, ReportEvent, Subscription, MatchResult, Channel, DispatchStatus, DispatchOutcome};
pub use requests::{CreateReportRequest, SubscribeRequest, NearbyReportsQuery, ListReportsQuery};
pub use responses::{NearbyReport, HealthResponse, ErrorResponse, SubscribeResponse};
