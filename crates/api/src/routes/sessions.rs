//! Session endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::session::{CreateSessionRequest, CreateSessionResponse};
use domain::models::Session;

use super::session_id_from_path;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_session_created;

/// Create a tracking session.
///
/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let created = state.sessions.create_session(request, Utc::now()).await?;
    record_session_created();
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let id = session_id_from_path(&session_id)?;
    state
        .sessions
        .find_session(id)
        .await
        .into_option()
        .map(Json)
        .ok_or_else(ApiError::session_not_found)
}
