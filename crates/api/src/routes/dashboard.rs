//! Dashboard snapshot handler.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::{DashboardSnapshot, Session};
use domain::services::DashboardView;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::session_id_from_path;
use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub session: Session,
    pub dashboard: DashboardSnapshot,
}

/// Bulk read rendered into a snapshot. Read failures leave the dashboard empty.
pub(crate) async fn build_snapshot(
    state: &AppState,
    session: &Session,
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let rows = match state.locations.list_for_session(session.id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Error fetching locations");
            Vec::new()
        }
    };
    DashboardView::load(rows, now).snapshot(now)
}

/// GET /api/v1/sessions/:session_id/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let id = session_id_from_path(&session_id)?;
    let session = state
        .sessions
        .find_session(id)
        .await
        .into_option()
        .ok_or_else(ApiError::session_not_found)?;

    let dashboard = build_snapshot(&state, &session, Utc::now()).await;
    Ok(Json(DashboardResponse { session, dashboard }))
}
