//! Location feed endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::location::{ReportLocationRequest, ReportLocationResponse};
use domain::models::LocationReport;
use tracing::{debug, error};
use validator::Validate;

use super::session_id_from_path;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_location_rejected, record_location_reported};

/// Append one report to an active session and publish it to live subscribers.
///
/// POST /api/v1/sessions/:session_id/locations
pub async fn report_location(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ReportLocationRequest>,
) -> Result<(StatusCode, Json<ReportLocationResponse>), ApiError> {
    let id = session_id_from_path(&session_id)?;

    if let Err(e) = request.validate() {
        record_location_rejected("validation");
        return Err(e.into());
    }

    if state.sessions.find_joinable_session(id).await.into_option().is_none() {
        record_location_rejected("unknown_session");
        return Err(ApiError::session_not_found());
    }

    if let Err(retry_after_secs) = state
        .rate_limiter
        .check(id, request.participant_name.as_deref())
    {
        record_location_rejected("rate_limited");
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    let location = state
        .locations
        .append(request.into_new_report(id, Utc::now()))
        .await
        .map_err(|e| {
            error!(session_id = %id, error = %e, "Error saving location");
            record_location_rejected("storage");
            ApiError::from(e)
        })?;

    record_location_reported();
    debug!(session_id = %id, location_id = %location.id, "Location stored");

    Ok((
        StatusCode::CREATED,
        Json(ReportLocationResponse {
            success: true,
            location,
        }),
    ))
}

/// All reports of a session, newest first.
///
/// GET /api/v1/sessions/:session_id/locations
pub async fn list_locations(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<LocationReport>>, ApiError> {
    let id = session_id_from_path(&session_id)?;
    if state.sessions.find_session(id).await.into_option().is_none() {
        return Err(ApiError::session_not_found());
    }
    let rows = state.locations.list_for_session(id).await?;
    Ok(Json(rows))
}
