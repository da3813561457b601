//! Page states for the shareable tracking and dashboard links.
//!
//! Each handler answers with the data a client needs to render the page, or the
//! not-found state with a link back to session creation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::session::parse_session_id;
use domain::models::{DashboardSnapshot, Session};
use domain::services::PositionOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dashboard::build_snapshot;
use crate::app::AppState;
use crate::error::SESSION_NOT_FOUND;

pub const TRACKING_NOT_FOUND_DESCRIPTION: &str =
    "This tracking session does not exist or has expired.";
pub const DASHBOARD_NOT_FOUND_DESCRIPTION: &str =
    "This tracking session does not exist or has been deleted.";
pub const RECOVERY_URL: &str = "/";
pub const RECOVERY_LABEL: &str = "Create New Session";

#[derive(Debug, Serialize, Deserialize)]
pub struct NotFoundState {
    pub title: String,
    pub description: String,
    pub recovery_url: String,
    pub recovery_label: String,
}

impl NotFoundState {
    fn new(description: &str) -> Self {
        Self {
            title: SESSION_NOT_FOUND.to_string(),
            description: description.to_string(),
            recovery_url: RECOVERY_URL.to_string(),
            recovery_label: RECOVERY_LABEL.to_string(),
        }
    }

    fn respond(self) -> Response {
        (StatusCode::NOT_FOUND, Json(PageState::<()>::NotFound(self))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub session_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            session_name: session.session_name.clone(),
            status: session.status_label().to_string(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Geolocation settings the reporting client should use.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeolocationSettings {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl From<PositionOptions> for GeolocationSettings {
    fn from(options: PositionOptions) -> Self {
        Self {
            high_accuracy: options.high_accuracy,
            timeout_ms: options.timeout.as_millis() as u64,
            maximum_age_ms: options.maximum_age.as_millis() as u64,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackingPage {
    pub session: SessionSummary,
    pub report_url: String,
    pub permission_request: GeolocationSettings,
    pub watch: GeolocationSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardPage {
    pub session: SessionSummary,
    pub tracking_url: String,
    pub live_url: String,
    pub dashboard: DashboardSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState<T> {
    Ready(T),
    NotFound(NotFoundState),
}

/// GET /track/:session_id
pub async fn tracking_page(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(id) = parse_session_id(&session_id) else {
        return NotFoundState::new(TRACKING_NOT_FOUND_DESCRIPTION).respond();
    };
    let Some(session) = state.sessions.find_joinable_session(id).await.into_option() else {
        return NotFoundState::new(TRACKING_NOT_FOUND_DESCRIPTION).respond();
    };

    let page = TrackingPage {
        session: SessionSummary::from(&session),
        report_url: format!("/api/v1/sessions/{}/locations", session.id),
        permission_request: PositionOptions::PERMISSION_REQUEST.into(),
        watch: PositionOptions::WATCH.into(),
    };
    Json(PageState::Ready(page)).into_response()
}

/// GET /dashboard/:session_id
pub async fn dashboard_page(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(id) = parse_session_id(&session_id) else {
        return NotFoundState::new(DASHBOARD_NOT_FOUND_DESCRIPTION).respond();
    };
    let Some(session) = state.sessions.find_session(id).await.into_option() else {
        return NotFoundState::new(DASHBOARD_NOT_FOUND_DESCRIPTION).respond();
    };

    let dashboard = build_snapshot(&state, &session, Utc::now()).await;
    let page = DashboardPage {
        session: SessionSummary::from(&session),
        tracking_url: state.sessions.tracking_url(session.id),
        live_url: format!("/api/v1/sessions/{}/live", session.id),
        dashboard,
    };
    Json(PageState::Ready(page)).into_response()
}
