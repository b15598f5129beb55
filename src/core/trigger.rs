use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::Instrument;

use crate::core::dispatcher::NotificationDispatcher;
use crate::core::location::parse_location;
use crate::core::matcher::ProximityMatcher;
use crate::models::{Coordinate, DispatchOutcome, NearbyReport, ReportEvent};
use crate::services::store::{ReportStore, StoreError, SubscriptionStore};

/// The only failure the alert pipeline surfaces to its callers
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("failed to load alert candidates: {0}")]
    Store(#[from] StoreError),
}

/// Totals from one reconciliation sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub run_id: String,
    pub reports_checked: usize,
    pub reports_matched: usize,
    pub deliveries: usize,
    pub failures: usize,
}

/// Entry point of the alert pipeline
///
/// Three ways in:
/// - [`AlertTrigger::on_report_created`] once per newly committed report
/// - [`AlertTrigger::nearby_reports`] for "what's near me" lookups (no sends)
/// - [`AlertTrigger::sweep`] as a periodic reconciliation job
///
/// Repeated invocations may notify the same subscriber about the same
/// report more than once; there is no delivery ledger.
pub struct AlertTrigger {
    reports: Arc<dyn ReportStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    matcher: ProximityMatcher,
    dispatcher: NotificationDispatcher,
}

impl AlertTrigger {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        matcher: ProximityMatcher,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            reports,
            subscriptions,
            matcher,
            dispatcher,
        }
    }

    pub fn matcher(&self) -> &ProximityMatcher {
        &self.matcher
    }

    /// Alert subscribers near a freshly committed report
    ///
    /// A report without a usable location is skipped silently. Provider
    /// failures are captured in the returned outcomes; only a failure to
    /// load subscriptions is an error.
    pub async fn on_report_created(
        &self,
        event: &ReportEvent,
    ) -> Result<Vec<DispatchOutcome>, AlertError> {
        let origin = match parse_location(event.location.as_deref()) {
            Ok(origin) => origin,
            Err(e) => {
                tracing::debug!("Report {} has no usable location ({}), skipping alerts", event.id, e);
                return Ok(Vec::new());
            }
        };

        let subscriptions = self.subscriptions.subscriptions().await?;
        let sends = {
            let matches = self.matcher.subscribers_near(&origin, &subscriptions);

            tracing::info!(
                "Report {} matched {} of {} subscriptions",
                event.id,
                matches.len(),
                subscriptions.len()
            );

            self.dispatcher
                .dispatch(event, matches.iter().map(|m| m.candidate))
        };

        Ok(sends.await)
    }

    /// Recent reports within `radius_km` of `origin`, nearest first
    pub async fn nearby_reports(
        &self,
        origin: &Coordinate,
        radius_km: f64,
        max_age: Duration,
    ) -> Result<Vec<NearbyReport>, AlertError> {
        let reports = self.reports.reports_since(window_start(max_age)).await?;

        let nearby = self
            .matcher
            .find_within(origin, reports, radius_km, Some(max_age))
            .into_iter()
            .map(|m| NearbyReport {
                latitude: m.coordinate.latitude(),
                longitude: m.coordinate.longitude(),
                distance_km: m.distance_km,
                report: m.candidate,
            })
            .collect();

        Ok(nearby)
    }

    /// Match every subscription against every report newer than `max_age`
    /// and dispatch the same way the creation path does
    pub async fn sweep(&self, max_age: Duration) -> Result<SweepSummary, AlertError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("alert_sweep", run_id = %run_id);

        self.run_sweep(run_id, max_age).instrument(span).await
    }

    async fn run_sweep(&self, run_id: String, max_age: Duration) -> Result<SweepSummary, AlertError> {
        let subscriptions = self.subscriptions.subscriptions().await?;
        let reports = self.reports.reports_since(window_start(max_age)).await?;

        let mut summary = SweepSummary {
            run_id: run_id.clone(),
            reports_checked: reports.len(),
            ..Default::default()
        };

        for report in reports {
            let event = report.event();
            let Ok(origin) = parse_location(event.location.as_deref()) else {
                continue;
            };

            let sends = {
                let matches = self.matcher.subscribers_near(&origin, &subscriptions);
                if matches.is_empty() {
                    continue;
                }
                self.dispatcher
                    .dispatch(&event, matches.iter().map(|m| m.candidate))
            };

            summary.reports_matched += 1;
            let outcomes = sends.await;

            let delivered = outcomes.iter().filter(|o| o.delivered()).count();
            summary.deliveries += delivered;
            summary.failures += outcomes.len() - delivered;
        }

        tracing::info!(
            "Sweep {} checked {} reports, {} matched, {} delivered, {} failed",
            run_id,
            summary.reports_checked,
            summary.reports_matched,
            summary.deliveries,
            summary.failures
        );

        Ok(summary)
    }
}

/// Oldest creation time inside a `max_age` window ending now
///
/// Windows reaching past the representable range start at the earliest
/// representable instant.
fn window_start(max_age: Duration) -> DateTime<Utc> {
    Utc::now()
        .checked_sub_signed(max_age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl std::fmt::Debug for AlertTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertTrigger")
            .field("matcher", &self.matcher)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
