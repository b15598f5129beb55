// Integration tests for Food Alerts

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use food_alerts::core::{
    AlertMessage, AlertTrigger, NotificationDispatcher, Notifier, NotifyError, ProximityMatcher,
};
use food_alerts::models::{Channel, Coordinate, DispatchStatus, Report, SeverityLevel, Subscription};
use food_alerts::services::{
    EmailClient, ReportStore, SeverityClassifier, SmsClient, StoreError, SubscriptionStore,
};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

/// In-memory stand-in for the Postgres store
#[derive(Default)]
struct MemoryStore {
    reports: Vec<Report>,
    subscriptions: Vec<Subscription>,
    fail: bool,
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn reports_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .reports
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self.subscriptions.clone())
    }
}

/// Notifier that records every recipient and optionally fails or stalls
struct RecordingNotifier {
    channel: Channel,
    fail: bool,
    delay: Option<std::time::Duration>,
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            fail: false,
            delay: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn failing(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            fail: true,
            delay: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, to: &str, _message: &AlertMessage) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(to.to_string());
        if self.fail {
            return Err(NotifyError::ProviderError("503 Service Unavailable".to_string()));
        }
        Ok(())
    }
}

fn create_report(id: i64, location: Option<&str>, age_hours: i64) -> Report {
    let created_at = Utc::now() - Duration::hours(age_hours);
    Report {
        id,
        title: format!("Report {}", id),
        description: "Food poisoning after lunch".to_string(),
        location: location.map(str::to_string),
        business_name: Some("Deli".to_string()),
        severity: SeverityLevel::High,
        symptoms: vec!["nausea".to_string()],
        tags: vec![],
        created_at,
        updated_at: created_at,
    }
}

fn create_subscription(id: i64, lat: f64, lon: f64, email: Option<&str>, phone: Option<&str>) -> Subscription {
    Subscription {
        id,
        username: format!("user{}", id),
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
        latitude: lat,
        longitude: lon,
        created_at: Utc::now(),
    }
}

fn create_trigger(
    store: MemoryStore,
    email: Arc<RecordingNotifier>,
    sms: Arc<RecordingNotifier>,
) -> AlertTrigger {
    let store = Arc::new(store);
    AlertTrigger::new(
        store.clone(),
        store,
        ProximityMatcher::default(),
        NotificationDispatcher::new(Some(email), Some(sms), 4, std::time::Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn test_end_to_end_only_nearby_subscriber_alerted() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        subscriptions: vec![
            create_subscription(1, 40.001, -75.0, Some("near@example.com"), None),
            create_subscription(2, 50.0, -75.0, Some("far@example.com"), None),
        ],
        ..Default::default()
    };
    let trigger = create_trigger(store, email.clone(), sms.clone());

    let report = create_report(10, Some("40.0,-75.0"), 0);
    let outcomes = assert_ok!(trigger.on_report_created(&report.event()).await);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].subscription_id, 1);
    assert_eq!(outcomes[0].report_id, 10);
    assert!(outcomes[0].delivered());
    assert_eq!(email.sent(), vec!["near@example.com"]);
    assert!(sms.sent().is_empty());
}

#[tokio::test]
async fn test_report_without_location_sends_nothing() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        subscriptions: vec![create_subscription(1, 40.0, -75.0, Some("a@example.com"), Some("+15550100"))],
        ..Default::default()
    };
    let trigger = create_trigger(store, email.clone(), sms.clone());

    for location in [None, Some(""), Some("somewhere downtown"), Some("40.0,-75.0,1")] {
        let report = create_report(1, location, 0);
        let outcomes = assert_ok!(trigger.on_report_created(&report.event()).await);
        assert!(outcomes.is_empty());
    }

    assert!(email.sent().is_empty());
    assert!(sms.sent().is_empty());
}

#[tokio::test]
async fn test_unparsable_report_location_skips_store() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        fail: true,
        ..Default::default()
    };
    let trigger = create_trigger(store, email, sms);

    // Never reaches the store, so the broken store is not observed
    let report = create_report(1, None, 0);
    assert_ok!(trigger.on_report_created(&report.event()).await);
}

#[tokio::test]
async fn test_store_failure_is_surfaced() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        fail: true,
        ..Default::default()
    };
    let trigger = create_trigger(store, email.clone(), sms);

    let report = create_report(1, Some("40.0,-75.0"), 0);
    assert_err!(trigger.on_report_created(&report.event()).await);

    let origin = Coordinate::new(40.0, -75.0).unwrap();
    assert_err!(trigger.nearby_reports(&origin, 5.0, Duration::hours(24)).await);
    assert!(email.sent().is_empty());
}

#[tokio::test]
async fn test_both_channels_independent() {
    let email = RecordingNotifier::failing(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        subscriptions: vec![create_subscription(1, 40.0, -75.0, Some("a@example.com"), Some("+15550100"))],
        ..Default::default()
    };
    let trigger = create_trigger(store, email.clone(), sms.clone());

    let report = create_report(3, Some("40.0,-75.0"), 0);
    let outcomes = assert_ok!(trigger.on_report_created(&report.event()).await);

    assert_eq!(outcomes.len(), 2);
    let email_outcome = outcomes.iter().find(|o| o.channel == Channel::Email).unwrap();
    let sms_outcome = outcomes.iter().find(|o| o.channel == Channel::Sms).unwrap();
    assert!(matches!(email_outcome.status, DispatchStatus::Failed { .. }));
    assert_eq!(sms_outcome.status, DispatchStatus::Delivered);
    assert_eq!(email.sent(), vec!["a@example.com"]);
    assert_eq!(sms.sent(), vec!["+15550100"]);
}

#[tokio::test]
async fn test_hung_provider_times_out_without_blocking_others() {
    let slow_email = Arc::new(RecordingNotifier {
        channel: Channel::Email,
        fail: false,
        delay: Some(std::time::Duration::from_secs(30)),
        sent: Mutex::new(Vec::new()),
    });
    let sms = RecordingNotifier::new(Channel::Sms);
    let dispatcher = NotificationDispatcher::new(
        Some(slow_email.clone()),
        Some(sms.clone()),
        4,
        std::time::Duration::from_millis(50),
    );
    let subscriptions = vec![
        create_subscription(1, 40.0, -75.0, Some("a@example.com"), None),
        create_subscription(2, 40.0, -75.0, None, Some("+15550101")),
    ];

    let report = create_report(4, Some("40.0,-75.0"), 0);
    let started = std::time::Instant::now();
    let outcomes = dispatcher.dispatch(&report.event(), &subscriptions).await;

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].status, DispatchStatus::TimedOut);
    assert_eq!(outcomes[1].status, DispatchStatus::Delivered);
    assert!(slow_email.sent().is_empty());
}

#[tokio::test]
async fn test_nearby_reports_query() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        reports: vec![
            create_report(1, Some("40.02,-75.0"), 1),
            create_report(2, Some("40.001,-75.0"), 2),
            create_report(3, Some("40.0,-75.0"), 48),   // too old
            create_report(4, Some("45.0,-75.0"), 1),    // too far
            create_report(5, Some("bad"), 1),           // unparsable
        ],
        subscriptions: vec![create_subscription(1, 40.0, -75.0, Some("a@example.com"), None)],
        ..Default::default()
    };
    let trigger = create_trigger(store, email.clone(), sms);

    let origin = Coordinate::new(40.0, -75.0).unwrap();
    let nearby = assert_ok!(trigger.nearby_reports(&origin, 5.0, Duration::hours(24)).await);

    let ids: Vec<i64> = nearby.iter().map(|n| n.report.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(nearby[0].latitude, 40.001);
    assert_eq!(nearby[0].longitude, -75.0);
    assert!(nearby[0].distance_km < nearby[1].distance_km);

    // Query path never notifies
    assert!(email.sent().is_empty());
}

#[tokio::test]
async fn test_sweep_dispatches_recent_matches() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        reports: vec![
            create_report(1, Some("40.0,-75.0"), 1),
            create_report(2, Some("40.0,-75.0"), 30),  // outside recency window
            create_report(3, None, 1),
        ],
        subscriptions: vec![
            create_subscription(1, 40.001, -75.0, Some("a@example.com"), Some("+15550100")),
            create_subscription(2, 10.0, 10.0, Some("b@example.com"), None),
        ],
        ..Default::default()
    };
    let trigger = create_trigger(store, email.clone(), sms.clone());

    let summary = assert_ok!(trigger.sweep(Duration::hours(24)).await);

    assert_eq!(summary.reports_checked, 2);
    assert_eq!(summary.reports_matched, 1);
    assert_eq!(summary.deliveries, 2);
    assert_eq!(summary.failures, 0);
    assert_eq!(email.sent(), vec!["a@example.com"]);
    assert_eq!(sms.sent(), vec!["+15550100"]);

    // No delivery ledger: a second sweep notifies again
    let again = assert_ok!(trigger.sweep(Duration::hours(24)).await);
    assert_eq!(again.deliveries, 2);
    assert_ne!(again.run_id, summary.run_id);
    assert_eq!(email.sent().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sweep_runs_as_spawned_task() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        reports: vec![create_report(1, Some("40.0,-75.0"), 1)],
        subscriptions: vec![create_subscription(1, 40.001, -75.0, Some("a@example.com"), Some("+15550100"))],
        ..Default::default()
    };
    let trigger = Arc::new(create_trigger(store, email.clone(), sms.clone()));

    // Same shape as the server's scheduled sweep
    let handle = tokio::spawn({
        let trigger = trigger.clone();
        async move { trigger.sweep(Duration::hours(24)).await }
    });
    let summary = assert_ok!(handle.await.expect("sweep task panicked"));
    assert_eq!(summary.deliveries, 2);

    let report = create_report(2, Some("40.0,-75.0"), 0);
    let handle = tokio::spawn({
        let trigger = trigger.clone();
        async move { trigger.on_report_created(&report.event()).await }
    });
    let outcomes = assert_ok!(handle.await.expect("alert task panicked"));
    assert_eq!(outcomes.len(), 2);
    assert_eq!(email.sent().len(), 2);
}

#[tokio::test]
async fn test_oversized_windows_do_not_overflow() {
    let email = RecordingNotifier::new(Channel::Email);
    let sms = RecordingNotifier::new(Channel::Sms);
    let store = MemoryStore {
        reports: vec![
            create_report(1, Some("40.0,-75.0"), 1),
            create_report(2, Some("40.001,-75.0"), 24 * 365 * 30),
        ],
        ..Default::default()
    };
    let trigger = create_trigger(store, email, sms);
    let huge = Duration::hours(i64::from(u32::MAX));

    let origin = Coordinate::new(40.0, -75.0).unwrap();
    let nearby = assert_ok!(trigger.nearby_reports(&origin, 5.0, huge).await);
    let ids: Vec<i64> = nearby.iter().map(|n| n.report.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let summary = assert_ok!(trigger.sweep(huge).await);
    assert_eq!(summary.reports_checked, 2);
}

#[tokio::test]
async fn test_email_client_posts_to_provider() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/email")
        .match_header("X-Server-Token", "token")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "To": "ana@example.com",
            "Subject": "Nearby Alert: Report 1"
        })))
        .with_status(200)
        .create_async()
        .await;

    let client = EmailClient::new(
        server.url(),
        "token".to_string(),
        "alerts@example.com".to_string(),
        std::time::Duration::from_secs(5),
    )
    .unwrap();

    let message = AlertMessage::for_report(&create_report(1, Some("40.0,-75.0"), 0).event());
    assert_ok!(client.send("ana@example.com", &message).await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_sms_client_reports_provider_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
        .match_body(mockito::Matcher::UrlEncoded("To".into(), "+15550100".into()))
        .with_status(400)
        .with_body(r#"{"message": "invalid number"}"#)
        .create_async()
        .await;

    let client = SmsClient::new(
        server.url(),
        "AC123".to_string(),
        "secret".to_string(),
        "+15550000".to_string(),
        std::time::Duration::from_secs(5),
    )
    .unwrap();

    let message = AlertMessage::for_report(&create_report(1, Some("40.0,-75.0"), 0).event());
    let err = client.send("+15550100", &message).await.unwrap_err();

    assert!(matches!(err, NotifyError::ProviderError(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_classifier_maps_predicted_label() {
    let mut server = mockito::Server::new_async().await;
    let _labels = server
        .mock("GET", "/labels")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["allergens", "biological", "chemical", "foreign bodies"]"#)
        .create_async()
        .await;
    let _predict = server
        .mock("POST", "/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"class_id": 2}"#)
        .create_async()
        .await;

    let classifier = SeverityClassifier::initialize(server.url(), std::time::Duration::from_secs(5)).await;

    assert!(classifier.is_ready());
    assert_eq!(
        assert_ok!(classifier.classify("pesticide residue on spinach").await),
        SeverityLevel::Medium
    );
}

#[tokio::test]
async fn test_classifier_init_failure_falls_back() {
    let mut server = mockito::Server::new_async().await;
    let _labels = server
        .mock("GET", "/labels")
        .with_status(500)
        .create_async()
        .await;

    let classifier = SeverityClassifier::initialize(server.url(), std::time::Duration::from_secs(5)).await;

    assert!(!classifier.is_ready());
    assert_err!(classifier.classify("raw chicken").await);
    assert_eq!(classifier.classify_or_default("raw chicken").await, SeverityLevel::Medium);
}
