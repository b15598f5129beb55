use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{CreateReportRequest, Report, SeverityLevel, SubscribeRequest, Subscription, Symptom, Tag};
use crate::services::store::{ReportStore, StoreError, SubscriptionStore};

/// Columns shared by every report query, with symptom and tag names
/// aggregated into arrays
const REPORT_COLUMNS: &str = r#"
    r.id, r.title, r.description, r.location, r.business_name, r.severity,
    r.created_at, r.updated_at,
    ARRAY(
        SELECT s.name FROM symptoms s
        JOIN report_symptoms rs ON rs.symptom_id = s.id
        WHERE rs.report_id = r.id
        ORDER BY s.name
    ) AS symptoms,
    ARRAY(
        SELECT t.name FROM tags t
        JOIN report_tags rt ON rt.tag_id = t.id
        WHERE rt.report_id = r.id
        ORDER BY t.name
    ) AS tags
"#;

/// PostgreSQL client for reports and subscriptions
///
/// Owns the durable state the alert pipeline reads. Report creation
/// commits before returning, so anything triggered afterwards only ever
/// sees committed rows.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Create a client whose pool connects on first use
    ///
    /// No migrations are run.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Insert a report with its symptom and tag links in one transaction
    ///
    /// Unknown symptom or tag ids are ignored. Returns the committed report.
    pub async fn create_report(
        &self,
        request: &CreateReportRequest,
        severity: SeverityLevel,
    ) -> Result<Report, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO reports (title, description, location, business_name, severity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(&request.business_name)
        .bind(severity)
        .fetch_one(&mut *tx)
        .await?;

        let report_id: i64 = row.try_get("id")?;

        if !request.symptoms.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO report_symptoms (report_id, symptom_id)
                SELECT $1, id FROM symptoms WHERE id = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(report_id)
            .bind(&request.symptoms)
            .execute(&mut *tx)
            .await?;
        }

        if !request.tags.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO report_tags (report_id, tag_id)
                SELECT $1, id FROM tags WHERE id = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(report_id)
            .bind(&request.tags)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Committed report {} ({})", report_id, severity);

        self.get_report(report_id).await
    }

    /// Get a single report by id
    pub async fn get_report(&self, report_id: i64) -> Result<Report, StoreError> {
        let query = format!("SELECT {} FROM reports r WHERE r.id = $1", REPORT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Report {} not found", report_id)))?;

        Ok(report_from_row(&row)?)
    }

    /// List reports, newest first
    pub async fn list_reports(&self, limit: i64) -> Result<Vec<Report>, StoreError> {
        let query = format!(
            "SELECT {} FROM reports r ORDER BY r.created_at DESC LIMIT $1",
            REPORT_COLUMNS
        );

        let rows = sqlx::query(&query).bind(limit).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| report_from_row(row).map_err(StoreError::from))
            .collect()
    }

    /// List all known symptoms
    pub async fn list_symptoms(&self) -> Result<Vec<Symptom>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM symptoms ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Symptom, StoreError> {
                Ok(Symptom {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    /// List all known tags
    pub async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Tag, StoreError> {
                Ok(Tag {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    /// Register a subscription and return its id
    pub async fn create_subscription(&self, request: &SubscribeRequest) -> Result<i64, StoreError> {
        let query = r#"
            INSERT INTO subscriptions (username, email, phone, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(&request.username)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(request.latitude)
            .bind(request.longitude)
            .fetch_one(&self.pool)
            .await?;

        let id: i64 = row.try_get("id")?;

        tracing::info!("Registered subscription {} for {}", id, request.username);

        Ok(id)
    }

    /// List all subscriptions in registration order
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let query = r#"
            SELECT id, username, email, phone, latitude, longitude, created_at
            FROM subscriptions
            ORDER BY id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Subscription, StoreError> {
                Ok(Subscription {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    email: row.try_get("email")?,
                    phone: row.try_get("phone")?,
                    latitude: row.try_get("latitude")?,
                    longitude: row.try_get("longitude")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn report_from_row(row: &PgRow) -> Result<Report, sqlx::Error> {
    Ok(Report {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        business_name: row.try_get("business_name")?,
        severity: row.try_get("severity")?,
        symptoms: row.try_get("symptoms")?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ReportStore for PostgresClient {
    async fn reports_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>, StoreError> {
        let query = format!(
            "SELECT {} FROM reports r WHERE r.created_at >= $1 ORDER BY r.created_at DESC",
            REPORT_COLUMNS
        );

        let rows = sqlx::query(&query).bind(since).fetch_all(&self.pool).await?;

        tracing::debug!("Loaded {} reports since {}", rows.len(), since);

        rows.iter()
            .map(|row| report_from_row(row).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl SubscriptionStore for PostgresClient {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.list_subscriptions().await
    }
}
