//! Storage seams for sessions and the location feed.
//!
//! The Postgres repositories in the persistence crate implement these traits for
//! production; [`InMemoryStore`] backs tests and local demos.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{LocationReport, NewLocationReport, NewSession, Session};

/// Errors raised by a storage backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Referenced record not found: {0}")]
    ForeignKey(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// The `tracking_sessions` table.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session; the store generates its id.
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Look up a session regardless of its active flag.
    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// Look up a session only if `is_active` is set.
    async fn find_active_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// Delete sessions that expired before `cutoff`, with their reports.
    /// Returns the deleted ids.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError>;

    /// Cheap connectivity check for health endpoints.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// The append-only `locations` table.
#[async_trait]
pub trait LocationFeed: Send + Sync {
    /// Append one report; the store generates its id.
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError>;

    /// All reports of a session, newest first by timestamp.
    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<LocationReport>, StoreError>;
}

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, Session>,
    locations: Vec<LocationReport>,
}

/// In-memory implementation of both tables.
///
/// Enforces the session foreign key on append, like the Postgres schema does.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reports across all sessions.
    pub async fn location_count(&self) -> usize {
        self.tables.read().await.locations.len()
    }

    /// Set the active flag directly; application code never does this.
    pub async fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(session) => {
                session.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let row = Session {
            id: Uuid::new_v4(),
            session_name: session.session_name,
            admin_email: session.admin_email,
            is_active: true,
            created_at: session.created_at,
            expires_at: session.expires_at,
        };
        self.tables
            .write()
            .await
            .sessions
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn find_active_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .get(&id)
            .filter(|s| s.is_active)
            .cloned())
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        let mut tables = self.tables.write().await;
        let expired: Vec<Uuid> = tables
            .sessions
            .values()
            .filter(|s| s.expires_at < cutoff)
            .map(|s| s.id)
            .collect();
        for id in &expired {
            tables.sessions.remove(id);
        }
        tables
            .locations
            .retain(|l| !expired.contains(&l.session_id));
        Ok(expired)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl LocationFeed for InMemoryStore {
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&report.session_id) {
            return Err(StoreError::ForeignKey(format!(
                "session {} does not exist",
                report.session_id
            )));
        }
        let row = LocationReport {
            id: Uuid::new_v4(),
            session_id: report.session_id,
            participant_name: report.participant_name,
            latitude: report.latitude,
            longitude: report.longitude,
            accuracy: report.accuracy,
            timestamp: report.timestamp,
        };
        tables.locations.push(row.clone());
        Ok(row)
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<LocationReport>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<LocationReport> = tables
            .locations
            .iter()
            .filter(|l| l.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_report(session_id: Uuid, name: &str, minutes_ago: i64) -> NewLocationReport {
        NewLocationReport {
            session_id,
            participant_name: Some(name.to_string()),
            latitude: 1.0,
            longitude: 2.0,
            accuracy: None,
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_session() {
        let store = InMemoryStore::new();
        let created = store
            .insert_session(NewSession::new("Field Trip".into(), None, Utc::now()))
            .await
            .unwrap();
        assert!(created.is_active);
        let found = store.find_session(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn test_find_active_session_filters_inactive() {
        let store = InMemoryStore::new();
        let created = store
            .insert_session(NewSession::new("Field Trip".into(), None, Utc::now()))
            .await
            .unwrap();
        store.set_active(created.id, false).await;
        assert!(store.find_active_session(created.id).await.unwrap().is_none());
        assert!(store.find_session(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_append_requires_existing_session() {
        let store = InMemoryStore::new();
        let err = store
            .append(new_report(Uuid::new_v4(), "Ann", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
        assert_eq!(store.location_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_scoped() {
        let store = InMemoryStore::new();
        let a = store
            .insert_session(NewSession::new("A".into(), None, Utc::now()))
            .await
            .unwrap();
        let b = store
            .insert_session(NewSession::new("B".into(), None, Utc::now()))
            .await
            .unwrap();
        store.append(new_report(a.id, "old", 10)).await.unwrap();
        store.append(new_report(a.id, "new", 1)).await.unwrap();
        store.append(new_report(b.id, "other", 0)).await.unwrap();

        let rows = store.list_for_session(a.id).await.unwrap();
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.participant_name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_delete_expired_cascades_locations() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let old = store
            .insert_session(NewSession::new("Old".into(), None, now - Duration::hours(72)))
            .await
            .unwrap();
        let fresh = store
            .insert_session(NewSession::new("Fresh".into(), None, now))
            .await
            .unwrap();
        store.append(new_report(old.id, "Ann", 4000)).await.unwrap();
        store.append(new_report(fresh.id, "Bob", 0)).await.unwrap();

        let deleted = store
            .delete_expired_before(now - Duration::hours(24))
            .await
            .unwrap();

        assert_eq!(deleted, vec![old.id]);
        assert!(store.find_session(old.id).await.unwrap().is_none());
        assert!(store.find_session(fresh.id).await.unwrap().is_some());
        assert_eq!(store.location_count().await, 1);
    }
}
