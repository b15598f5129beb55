// Core alert pipeline exports
pub mod dispatcher;
pub mod distance;
pub mod location;
pub mod matcher;
pub mod trigger;

pub use dispatcher::{AlertMessage, NotificationDispatcher, Notifier, NotifyError};
pub use distance::haversine_distance;
pub use location::{parse_location, parse_query_coordinate, LocationError};
pub use matcher::{Candidate, ProximityMatcher, DEFAULT_RADIUS_KM, DEFAULT_RECENCY_HOURS};
pub use trigger::{AlertError, AlertTrigger, SweepSummary};
