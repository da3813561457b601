//! Expired session cleanup.

use chrono::{Duration, Utc};
use domain::services::SessionStore;
use std::sync::Arc;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_expired_sessions_deleted;
use crate::middleware::RateLimiterState;

/// Deletes sessions whose `expires_at` lies more than the grace period in the past.
/// Their location reports go with them.
pub struct CleanupSessionsJob {
    store: Arc<dyn SessionStore>,
    rate_limiter: Arc<RateLimiterState>,
    grace: Duration,
}

impl CleanupSessionsJob {
    pub fn new(
        store: Arc<dyn SessionStore>,
        rate_limiter: Arc<RateLimiterState>,
        grace_hours: i64,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            grace: Duration::hours(grace_hours.max(0)),
        }
    }
}

#[async_trait::async_trait]
impl Job for CleanupSessionsJob {
    fn name(&self) -> &'static str {
        "cleanup_sessions"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let cutoff = Utc::now() - self.grace;
        let deleted = self
            .store
            .delete_expired_before(cutoff)
            .await
            .map_err(|e| format!("Failed to delete expired sessions: {}", e))?;

        for id in &deleted {
            self.rate_limiter.forget(*id);
        }
        record_expired_sessions_deleted(deleted.len() as u64);

        if !deleted.is_empty() {
            info!(
                deleted = deleted.len(),
                cutoff = %cutoff,
                "Cleaned up expired sessions"
            );
        }
        Ok(())
    }
}
