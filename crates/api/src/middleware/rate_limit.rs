//! Optional per-participant rate limiting for location ingest.
//!
//! Off unless `security.location_rate_limit_per_minute` is set. When enabled, each
//! participant of a session gets their own quota; reports without a name share one.

use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

type ParticipantRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Session id plus the trimmed participant name (empty for anonymous reports).
type LimiterKey = (Uuid, String);

pub struct RateLimiterState {
    limiters: RwLock<HashMap<LimiterKey, Arc<ParticipantRateLimiter>>>,
    quota: Option<Quota>,
}

impl RateLimiterState {
    /// `per_minute` of zero disables limiting.
    pub fn new(per_minute: u32) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            quota: NonZeroU32::new(per_minute).map(Quota::per_minute),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.quota.is_some()
    }

    fn limiter_for(&self, quota: Quota, key: LimiterKey) -> Arc<ParticipantRateLimiter> {
        if let Some(limiter) = self
            .limiters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Arc::clone(limiter);
        }

        let mut limiters = self.limiters.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            limiters
                .entry(key)
                .or_insert_with(|| Arc::new(GovRateLimiter::direct(quota))),
        )
    }

    /// `Err(retry_after_secs)` when the participant is over quota. Always `Ok` when disabled.
    pub fn check(&self, session_id: Uuid, participant_name: Option<&str>) -> Result<(), u64> {
        let Some(quota) = self.quota else {
            return Ok(());
        };
        let key = (
            session_id,
            participant_name.map(str::trim).unwrap_or_default().to_string(),
        );
        self.limiter_for(quota, key).check().map_err(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }

    /// Drop every limiter of a session that no longer exists.
    pub fn forget(&self, session_id: Uuid) {
        self.limiters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(id, _), _| *id != session_id);
    }

    pub fn tracked_participants(&self) -> usize {
        self.limiters.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("enabled", &self.is_enabled())
            .field("tracked_participants", &self.tracked_participants())
            .finish()
    }
}
