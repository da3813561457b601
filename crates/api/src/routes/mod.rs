//! HTTP route handlers.

pub mod dashboard;
pub mod health;
pub mod live;
pub mod locations;
pub mod pages;
pub mod sessions;

use domain::models::session::parse_session_id;
use uuid::Uuid;

use crate::error::ApiError;

/// Session id from a path segment. Malformed ids read as unknown sessions.
pub(crate) fn session_id_from_path(raw: &str) -> Result<Uuid, ApiError> {
    parse_session_id(raw).ok_or_else(ApiError::session_not_found)
}
