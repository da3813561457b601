//! Tracking session domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifetime of a tracking session, counted from creation.
pub const SESSION_TTL_HOURS: i64 = 24;

/// A named, time-bounded tracking context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub session_name: String,
    pub admin_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the expiry time has passed. Informational only; reads do not filter on it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Inactive"
        }
    }
}

/// Expiry timestamp for a session created at `created_at`.
pub fn expiry_for(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(SESSION_TTL_HOURS)
}

/// Values written when a session row is inserted. The id is generated by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub session_name: String,
    pub admin_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    pub fn new(session_name: String, admin_email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_name,
            admin_email,
            created_at: now,
            expires_at: expiry_for(now),
        }
    }
}

/// Request payload for session creation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(custom(function = "shared::validation::validate_session_name"))]
    pub session_name: String,

    /// Free text, kept as entered.
    #[serde(default)]
    pub admin_email: Option<String>,
}

impl CreateSessionRequest {
    /// Treats a blank admin email as absent.
    pub fn normalized(self) -> Self {
        let admin_email =
            shared::validation::non_blank(self.admin_email.as_deref()).map(str::to_string);
        Self {
            session_name: self.session_name,
            admin_email,
        }
    }
}

/// Response payload for session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session: Session,
    pub tracking_url: String,
    pub dashboard_url: String,
}

/// Parses a session id taken from a URL. Malformed ids are treated like unknown ones.
pub fn parse_session_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
