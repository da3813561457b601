//! Location repository for database operations.

use async_trait::async_trait;
use domain::models::{LocationReport, NewLocationReport};
use domain::services::{LocationFeed, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use super::store_error;
use crate::entities::LocationEntity;
use crate::metrics::QueryTimer;

/// Repository for the append-only locations table.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Append one report. Fails with a foreign key violation for unknown sessions.
    pub async fn insert(&self, report: &NewLocationReport) -> Result<LocationEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_location");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            INSERT INTO locations (session_id, participant_name, latitude, longitude, accuracy, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, session_id, participant_name, latitude, longitude, accuracy, timestamp
            "#,
        )
        .bind(report.session_id)
        .bind(&report.participant_name)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(report.accuracy)
        .bind(report.timestamp)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// All reports of a session, newest first.
    pub async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<LocationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_locations_by_session");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, session_id, participant_name, latitude, longitude, accuracy, timestamp
            FROM locations
            WHERE session_id = $1
            ORDER BY timestamp DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}

#[async_trait]
impl LocationFeed for LocationRepository {
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError> {
        self.insert(&report)
            .await
            .map(LocationReport::from)
            .map_err(store_error)
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<LocationReport>, StoreError> {
        self.find_by_session(session_id)
            .await
            .map(|rows| rows.into_iter().map(LocationReport::from).collect())
            .map_err(store_error)
    }
}
