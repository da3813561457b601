//! Tracking session repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{NewSession, Session};
use domain::services::{SessionStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use super::store_error;
use crate::entities::TrackingSessionEntity;
use crate::metrics::QueryTimer;

/// Repository for the tracking_sessions table.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a session. The id and is_active come from column defaults.
    pub async fn insert(&self, session: &NewSession) -> Result<TrackingSessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_tracking_session");
        let result = sqlx::query_as::<_, TrackingSessionEntity>(
            r#"
            INSERT INTO tracking_sessions (session_name, admin_email, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, session_name, admin_email, is_active, created_at, expires_at
            "#,
        )
        .bind(&session.session_name)
        .bind(&session.admin_email)
        .bind(session.created_at)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TrackingSessionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_tracking_session_by_id");
        let result = sqlx::query_as::<_, TrackingSessionEntity>(
            r#"
            SELECT id, session_name, admin_email, is_active, created_at, expires_at
            FROM tracking_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    pub async fn find_active_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<TrackingSessionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_tracking_session_by_id");
        let result = sqlx::query_as::<_, TrackingSessionEntity>(
            r#"
            SELECT id, session_name, admin_email, is_active, created_at, expires_at
            FROM tracking_sessions
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Delete sessions that expired before `cutoff`. Their locations cascade.
    pub async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("delete_expired_tracking_sessions");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM tracking_sessions
            WHERE expires_at < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("health_check");
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        timer.finish(&result);
        result.map(|_| ())
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        self.insert(&session)
            .await
            .map(Session::from)
            .map_err(store_error)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        self.find_by_id(id)
            .await
            .map(|row| row.map(Session::from))
            .map_err(store_error)
    }

    async fn find_active_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        self.find_active_by_id(id)
            .await
            .map(|row| row.map(Session::from))
            .map_err(store_error)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        SessionRepository::delete_expired_before(self, cutoff)
            .await
            .map_err(store_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.health_check().await.map_err(store_error)
    }
}
