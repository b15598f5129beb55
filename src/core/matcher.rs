use chrono::{DateTime, Duration, Utc};

use crate::core::location::parse_location;
use crate::models::{Coordinate, MatchResult, Report, ReportEvent, Subscription};

/// Default match radius in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Default recency window applied when matching reports
pub const DEFAULT_RECENCY_HOURS: i64 = 24;

/// Anything that can be placed on the map and optionally dated
pub trait Candidate {
    /// Resolved position, or `None` when the stored location is unusable
    fn coordinate(&self) -> Option<Coordinate>;

    /// When the candidate was created, if it carries a timestamp
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl Candidate for ReportEvent {
    fn coordinate(&self) -> Option<Coordinate> {
        parse_location(self.location.as_deref()).ok()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Candidate for Report {
    fn coordinate(&self) -> Option<Coordinate> {
        parse_location(self.location.as_deref()).ok()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Candidate for Subscription {
    fn coordinate(&self) -> Option<Coordinate> {
        // Stored as floats, but still range-checked
        Coordinate::new(self.latitude, self.longitude).ok()
    }
}

/// Radius and recency filter over an un-indexed candidate set
///
/// # Pipeline
/// 1. Resolve each candidate's position, dropping unusable locations
/// 2. Drop candidates older than the recency window, if one is given
/// 3. Keep candidates within the radius
/// 4. Order by distance ascending (stable, so ties keep input order)
#[derive(Debug, Clone, Copy)]
pub struct ProximityMatcher {
    radius_km: f64,
    recency: Duration,
}

impl ProximityMatcher {
    pub fn new(radius_km: f64, recency: Duration) -> Self {
        Self { radius_km, recency }
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn recency(&self) -> Duration {
        self.recency
    }

    /// Match candidates against `origin` as of the current time
    pub fn find_within<C: Candidate>(
        &self,
        origin: &Coordinate,
        candidates: impl IntoIterator<Item = C>,
        radius_km: f64,
        max_age: Option<Duration>,
    ) -> Vec<MatchResult<C>> {
        self.find_within_at(Utc::now(), origin, candidates, radius_km, max_age)
    }

    /// Match candidates against `origin` with an explicit notion of "now"
    pub fn find_within_at<C: Candidate>(
        &self,
        now: DateTime<Utc>,
        origin: &Coordinate,
        candidates: impl IntoIterator<Item = C>,
        radius_km: f64,
        max_age: Option<Duration>,
    ) -> Vec<MatchResult<C>> {
        // A window reaching past the representable range excludes nothing
        let cutoff = max_age.and_then(|age| now.checked_sub_signed(age));

        let mut matches: Vec<MatchResult<C>> = candidates
            .into_iter()
            .filter(|candidate| match (cutoff, candidate.timestamp()) {
                (Some(cutoff), Some(ts)) => ts >= cutoff,
                _ => true,
            })
            .filter_map(|candidate| {
                let coordinate = candidate.coordinate()?;
                let distance_km = origin.distance_to(&coordinate);

                (distance_km <= radius_km).then_some(MatchResult {
                    candidate,
                    coordinate,
                    distance_km,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        matches
    }

    /// Subscriptions within the configured radius of an event location
    ///
    /// Subscriptions carry no timestamp, so no recency window applies.
    pub fn subscribers_near<'a>(
        &self,
        origin: &Coordinate,
        subscriptions: &'a [Subscription],
    ) -> Vec<MatchResult<&'a Subscription>> {
        self.find_within(origin, subscriptions, self.radius_km, None)
    }

    /// Reports within the configured radius and recency window
    pub fn reports_near<C: Candidate>(
        &self,
        origin: &Coordinate,
        reports: impl IntoIterator<Item = C>,
    ) -> Vec<MatchResult<C>> {
        self.find_within(origin, reports, self.radius_km, Some(self.recency))
    }
}

impl<C: Candidate> Candidate for &C {
    fn coordinate(&self) -> Option<Coordinate> {
        (**self).coordinate()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        (**self).timestamp()
    }
}

impl Default for ProximityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_KM, Duration::hours(DEFAULT_RECENCY_HOURS))
    }
}
