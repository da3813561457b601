//! Tracking session entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the tracking_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct TrackingSessionEntity {
    pub id: Uuid,
    pub session_name: String,
    pub admin_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<TrackingSessionEntity> for domain::models::Session {
    fn from(entity: TrackingSessionEntity) -> Self {
        Self {
            id: entity.id,
            session_name: entity.session_name,
            admin_email: entity.admin_email,
            is_active: entity.is_active,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
        }
    }
}
