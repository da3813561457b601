//! Session creation and lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use super::store::{SessionStore, StoreError};
use crate::models::session::{CreateSessionRequest, CreateSessionResponse, NewSession};
use crate::models::Session;

/// Errors from the session creation flow.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any insert failure; the cause is logged, not shown.
    #[error("Failed to create tracking session")]
    CreateFailed(#[source] StoreError),
}

/// Outcome of reading a session for a page.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionLookup {
    Found(Session),
    NotFound,
}

impl SessionLookup {
    pub fn into_option(self) -> Option<Session> {
        match self {
            SessionLookup::Found(session) => Some(session),
            SessionLookup::NotFound => None,
        }
    }
}

/// Creates sessions and resolves session ids from links.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    base_url: String,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    /// Validate the request and insert one session expiring 24 hours after `now`.
    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
        now: DateTime<Utc>,
    ) -> Result<CreateSessionResponse, SessionError> {
        let request = request.normalized();
        request.validate().map_err(|e| {
            let messages: Vec<String> = e
                .field_errors()
                .iter()
                .flat_map(|(_, errors)| {
                    errors
                        .iter()
                        .map(|err| err.message.as_ref().map(|m| m.to_string()).unwrap_or_default())
                })
                .collect();
            SessionError::Validation(messages.join(", "))
        })?;

        let session = self
            .store
            .insert_session(NewSession::new(
                request.session_name,
                request.admin_email,
                now,
            ))
            .await
            .map_err(|e| {
                error!(error = %e, "Error creating session");
                SessionError::CreateFailed(e)
            })?;

        info!(
            session_id = %session.id,
            session_name = %session.session_name,
            expires_at = %session.expires_at,
            "Tracking session created"
        );

        Ok(CreateSessionResponse {
            tracking_url: shared::links::tracking_url(&self.base_url, session.id),
            dashboard_url: shared::links::dashboard_url(&self.base_url, session.id),
            session,
        })
    }

    /// Dashboard read: any stored session, active or not.
    pub async fn find_session(&self, id: Uuid) -> SessionLookup {
        Self::resolve(id, self.store.find_session(id).await)
    }

    /// Tracking read: only sessions with `is_active` set.
    pub async fn find_joinable_session(&self, id: Uuid) -> SessionLookup {
        Self::resolve(id, self.store.find_active_session(id).await)
    }

    pub fn tracking_url(&self, id: Uuid) -> String {
        shared::links::tracking_url(&self.base_url, id)
    }

    pub fn dashboard_url(&self, id: Uuid) -> String {
        shared::links::dashboard_url(&self.base_url, id)
    }

    // Read errors degrade to the not-found state.
    fn resolve(id: Uuid, result: Result<Option<Session>, StoreError>) -> SessionLookup {
        match result {
            Ok(Some(session)) => SessionLookup::Found(session),
            Ok(None) => SessionLookup::NotFound,
            Err(e) => {
                error!(session_id = %id, error = %e, "Error fetching session");
                SessionLookup::NotFound
            }
        }
    }
}
