//! Dashboard view state and the viewing-client flow.
//!
//! [`DashboardView`] holds the newest-first list of reports for one session and the
//! set of active participants. The list is loaded once, then live inserts are
//! prepended as they arrive. Nothing is re-sorted or de-duplicated, and the active
//! set only ever grows until the view is reloaded.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};
use uuid::Uuid;

use super::realtime::{ChangeEvent, ChangeFeed, Subscription};
use super::sessions::{SessionLookup, SessionService};
use super::store::LocationFeed;
use crate::models::{DashboardSnapshot, LocationEntry, LocationReport, Session};

/// Reports newer than this count a participant as active at load time.
pub const ACTIVE_WINDOW_MINUTES: i64 = 5;

/// Length of the recent-activity list.
pub const RECENT_LIMIT: usize = 10;

pub const EMPTY_MESSAGE: &str =
    "No locations received yet. Share the tracking link to start receiving data.";

pub const NO_DATA: &str = "No data";

/// Human "time ago" label with floored units.
pub fn time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    locations: Vec<LocationReport>,
    active: HashSet<String>,
}

impl DashboardView {
    /// Build the view from a newest-first bulk read.
    pub fn load(initial: Vec<LocationReport>, now: DateTime<Utc>) -> Self {
        let cutoff = now - Duration::minutes(ACTIVE_WINDOW_MINUTES);
        let active = initial
            .iter()
            .filter(|r| r.timestamp > cutoff)
            .map(|r| r.display_name().to_string())
            .collect();
        Self {
            locations: initial,
            active,
        }
    }

    /// Prepend one live insert. Anonymous inserts do not join the active set.
    pub fn apply_insert(&mut self, report: LocationReport) {
        if let Some(name) = report.participant_name.as_deref().filter(|n| !n.is_empty()) {
            self.active.insert(name.to_string());
        }
        self.locations.insert(0, report);
    }

    pub fn locations(&self) -> &[LocationReport] {
        &self.locations
    }

    pub fn total_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn active_participants(&self) -> &HashSet<String> {
        &self.active
    }

    pub fn active_participant_count(&self) -> usize {
        self.active.len()
    }

    /// First-encountered report per participant key, in list order.
    pub fn latest_locations(&self) -> Vec<&LocationReport> {
        let mut seen = HashSet::new();
        self.locations
            .iter()
            .filter(|r| seen.insert(r.participant_key()))
            .collect()
    }

    pub fn recent_locations(&self) -> &[LocationReport] {
        let end = self.locations.len().min(RECENT_LIMIT);
        &self.locations[..end]
    }

    pub fn last_update_label(&self, now: DateTime<Utc>) -> String {
        self.locations
            .first()
            .map(|r| time_ago(r.timestamp, now))
            .unwrap_or_else(|| NO_DATA.to_string())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        DashboardSnapshot {
            total_locations: self.total_locations(),
            active_participants: self.active_participant_count(),
            last_update: self.last_update_label(now),
            latest_locations: self
                .latest_locations()
                .into_iter()
                .map(|r| LocationEntry::from_report(r, now))
                .collect(),
            recent_locations: self
                .recent_locations()
                .iter()
                .map(|r| LocationEntry::from_report(r, now))
                .collect(),
            empty_message: self.is_empty().then(|| EMPTY_MESSAGE.to_string()),
        }
    }
}

/// Opens dashboards: session read, bulk read and live subscription.
#[derive(Clone)]
pub struct DashboardViewer {
    sessions: SessionService,
    feed: Arc<dyn LocationFeed>,
    changes: ChangeFeed,
    subscriber_limit: Option<usize>,
}

/// Result of mounting a dashboard.
pub enum DashboardMount {
    NotFound,
    /// The session already has as many live viewers as allowed.
    Full,
    Live(LiveDashboard),
}

impl DashboardViewer {
    pub fn new(sessions: SessionService, feed: Arc<dyn LocationFeed>, changes: ChangeFeed) -> Self {
        Self {
            sessions,
            feed,
            changes,
            subscriber_limit: None,
        }
    }

    /// Cap concurrent live dashboards per session.
    pub fn with_subscriber_limit(mut self, limit: usize) -> Self {
        self.subscriber_limit = Some(limit);
        self
    }

    /// Mount the dashboard of `session_id`.
    ///
    /// The subscription is registered before the bulk read resolves, so an insert
    /// landing in between is both read and delivered and will be counted twice.
    pub async fn mount(&self, session_id: Uuid, now: DateTime<Utc>) -> DashboardMount {
        let session = match self.sessions.find_session(session_id).await {
            SessionLookup::Found(session) => session,
            SessionLookup::NotFound => return DashboardMount::NotFound,
        };

        let subscription = match self.subscriber_limit {
            Some(limit) => match self.changes.try_subscribe(session_id, limit).await {
                Some(subscription) => subscription,
                None => return DashboardMount::Full,
            },
            None => self.changes.subscribe(session_id).await,
        };

        let initial = match self.feed.list_for_session(session_id).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Error fetching locations");
                Vec::new()
            }
        };
        debug!(
            session_id = %session_id,
            initial = initial.len(),
            "Dashboard mounted"
        );

        DashboardMount::Live(LiveDashboard {
            session,
            view: DashboardView::load(initial, now),
            subscription: Some(subscription),
            changes: self.changes.clone(),
        })
    }
}

/// A mounted dashboard holding its live subscription.
pub struct LiveDashboard {
    session: Session,
    view: DashboardView,
    subscription: Option<Subscription>,
    changes: ChangeFeed,
}

impl LiveDashboard {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    /// Apply every insert delivered so far. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        while let Some(event) = subscription.try_recv() {
            self.view.apply_insert(event.new);
            applied += 1;
        }
        applied
    }

    /// Wait for the next insert and apply it. `false` once the feed is closed.
    pub async fn next_event(&mut self) -> bool {
        self.next_change().await.is_some()
    }

    /// Wait for the next insert, apply it and hand the event back for forwarding.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        let subscription = self.subscription.as_mut()?;
        let event = subscription.recv().await?;
        self.view.apply_insert(event.new.clone());
        Some(event)
    }

    /// Name of the change topic this dashboard listens on.
    pub fn topic(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.topic())
    }

    /// Unregister the live subscription.
    pub async fn unmount(mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.changes.unsubscribe(subscription).await;
        }
    }
}
