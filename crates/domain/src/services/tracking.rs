//! Participant location reporting.
//!
//! A participant grants geolocation permission, names themselves and starts a
//! continuous position watch. Every fix becomes one independent append to the
//! location feed. Appends are best-effort: failures are logged and dropped, and
//! the watch keeps running.
//!
//! Device geolocation sits behind [`Geolocator`]; [`ReplayGeolocator`] plays back a
//! fixed list of fixes for demos and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::store::LocationFeed;
use crate::models::NewLocationReport;

/// A single position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

/// Options passed to position requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl PositionOptions {
    /// One-shot fix used to trigger the permission prompt.
    pub const PERMISSION_REQUEST: Self = Self {
        high_accuracy: true,
        timeout: Duration::from_secs(10),
        maximum_age: Duration::from_secs(5),
    };

    /// Continuous watch while sharing.
    pub const WATCH: Self = Self {
        high_accuracy: true,
        timeout: Duration::from_secs(15),
        maximum_age: Duration::from_secs(10),
    };
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Position request timed out")]
    Timeout,

    #[error("Permission query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

/// Handle of a registered position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// One delivery from a position watch.
pub type PositionEvent = Result<Position, GeolocationError>;

/// Device geolocation capability.
#[async_trait]
pub trait Geolocator: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn permission_state(&self) -> Result<PermissionState, GeolocationError>;

    async fn current_position(&self, options: PositionOptions)
        -> Result<Position, GeolocationError>;

    /// Start delivering fixes to `events` until [`Geolocator::clear_watch`] is called.
    fn watch_position(
        &self,
        options: PositionOptions,
        events: mpsc::UnboundedSender<PositionEvent>,
    ) -> WatchId;

    fn clear_watch(&self, id: WatchId);
}

/// User-facing notifications raised by the reporting flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    GeolocationUnsupported,
    PermissionGranted,
    PermissionDenied,
    PermissionError,
    NameRequired,
    TrackingStarted,
    TrackingStopped,
    LocationError,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::GeolocationUnsupported => "Geolocation Not Supported",
            Notice::PermissionGranted => "Permission Granted",
            Notice::PermissionDenied => "Permission Denied",
            Notice::PermissionError => "Permission Error",
            Notice::NameRequired => "Name Required",
            Notice::TrackingStarted => "Tracking Started",
            Notice::TrackingStopped => "Tracking Stopped",
            Notice::LocationError => "Location Error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Notice::GeolocationUnsupported => "Your browser doesn't support location tracking.",
            Notice::PermissionGranted => "Location access has been enabled.",
            Notice::PermissionDenied => "Location access is required for tracking.",
            Notice::PermissionError => "Unable to request location permission.",
            Notice::NameRequired => "Please enter your name before starting tracking.",
            Notice::TrackingStarted => "Your location is now being shared.",
            Notice::TrackingStopped => "Location sharing has been disabled.",
            Notice::LocationError => {
                "Unable to get your current location. Please check your settings."
            }
        }
    }

    /// Whether the notice reports a failure.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Notice::PermissionGranted | Notice::TrackingStarted | Notice::TrackingStopped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    NoPermission,
    PermissionGranted,
    Tracking,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackingError {
    #[error("Location permission has not been granted")]
    PermissionRequired,

    #[error("A participant name is required")]
    NameRequired,

    #[error("Location sharing is already active")]
    AlreadyTracking,
}

/// Reporting client for one participant in one session.
pub struct ParticipantTracker<G: Geolocator> {
    session_id: Uuid,
    geolocator: Arc<G>,
    feed: Arc<dyn LocationFeed>,
    state: TrackingState,
    participant_name: Option<String>,
    watch: Option<WatchId>,
    sent: Arc<AtomicU64>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<G: Geolocator> ParticipantTracker<G> {
    /// Create a tracker and the receiver of its user-facing notices.
    pub fn new(
        session_id: Uuid,
        geolocator: Arc<G>,
        feed: Arc<dyn LocationFeed>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let tracker = Self {
            session_id,
            geolocator,
            feed,
            state: TrackingState::NoPermission,
            participant_name: None,
            watch: None,
            sent: Arc::new(AtomicU64::new(0)),
            notices,
        };
        (tracker, notice_rx)
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Number of successfully stored reports.
    pub fn locations_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn participant_name(&self) -> Option<&str> {
        self.participant_name.as_deref()
    }

    /// Ask for geolocation permission.
    pub async fn request_permission(&mut self) -> TrackingState {
        if !self.geolocator.is_supported() {
            self.notify(Notice::GeolocationUnsupported);
            return self.state;
        }

        match self.geolocator.permission_state().await {
            Ok(PermissionState::Granted) => self.grant(),
            Ok(_) => {
                match self
                    .geolocator
                    .current_position(PositionOptions::PERMISSION_REQUEST)
                    .await
                {
                    Ok(_) => {
                        self.grant();
                        self.notify(Notice::PermissionGranted);
                    }
                    Err(e) => {
                        error!(error = %e, "Geolocation error");
                        self.notify(Notice::PermissionDenied);
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Permission error");
                self.notify(Notice::PermissionError);
            }
        }
        self.state
    }

    /// Start sharing under `participant_name`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, participant_name: &str) -> Result<(), TrackingError> {
        match self.state {
            TrackingState::NoPermission => return Err(TrackingError::PermissionRequired),
            TrackingState::Tracking => return Err(TrackingError::AlreadyTracking),
            TrackingState::PermissionGranted => {}
        }
        if participant_name.trim().is_empty() {
            self.notify(Notice::NameRequired);
            return Err(TrackingError::NameRequired);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let watch = self
            .geolocator
            .watch_position(PositionOptions::WATCH, events_tx);

        let reporter = Reporter {
            session_id: self.session_id,
            participant_name: participant_name.to_string(),
            feed: Arc::clone(&self.feed),
            sent: Arc::clone(&self.sent),
            notices: self.notices.clone(),
        };
        tokio::spawn(reporter.run(events_rx));

        self.watch = Some(watch);
        self.participant_name = Some(participant_name.to_string());
        self.state = TrackingState::Tracking;
        self.notify(Notice::TrackingStarted);
        info!(
            session_id = %self.session_id,
            participant = %participant_name,
            "Location sharing started"
        );
        Ok(())
    }

    /// Cancel the watch. Reports already handed to the feed are left to finish.
    pub fn stop(&mut self) {
        if let Some(id) = self.watch.take() {
            self.geolocator.clear_watch(id);
        }
        if self.state == TrackingState::Tracking {
            self.state = TrackingState::PermissionGranted;
        }
        self.notify(Notice::TrackingStopped);
        info!(
            session_id = %self.session_id,
            sent = self.locations_sent(),
            "Location sharing stopped"
        );
    }

    fn grant(&mut self) {
        if self.state == TrackingState::NoPermission {
            self.state = TrackingState::PermissionGranted;
        }
    }

    fn notify(&self, notice: Notice) {
        // Receiver may be gone if nobody renders notices.
        let _ = self.notices.send(notice);
    }
}

impl<G: Geolocator> Drop for ParticipantTracker<G> {
    fn drop(&mut self) {
        if let Some(id) = self.watch.take() {
            self.geolocator.clear_watch(id);
        }
    }
}

struct Reporter {
    session_id: Uuid,
    participant_name: String,
    feed: Arc<dyn LocationFeed>,
    sent: Arc<AtomicU64>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl Reporter {
    async fn run(self, mut events: mpsc::UnboundedReceiver<PositionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                Ok(position) => self.report(position).await,
                Err(e) => {
                    error!(session_id = %self.session_id, error = %e, "Geolocation error");
                    let _ = self.notices.send(Notice::LocationError);
                }
            }
        }
        debug!(session_id = %self.session_id, "Position watch ended");
    }

    async fn report(&self, position: Position) {
        let report = NewLocationReport {
            session_id: self.session_id,
            participant_name: Some(self.participant_name.clone()),
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: position.accuracy,
            timestamp: Utc::now(),
        };
        match self.feed.append(report).await {
            Ok(stored) => {
                let total = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(location_id = %stored.id, total, "Location sent");
            }
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Error saving location");
            }
        }
    }
}

/// Plays back a fixed sequence of fixes.
pub struct ReplayGeolocator {
    fixes: Vec<PositionEvent>,
    interval: Duration,
    supported: bool,
    permission: Result<PermissionState, GeolocationError>,
    first_fix: Result<Position, GeolocationError>,
    next_watch: AtomicU64,
    watches: Mutex<HashMap<WatchId, JoinHandle<()>>>,
}

impl ReplayGeolocator {
    pub fn new(fixes: Vec<PositionEvent>) -> Self {
        let first_fix = fixes
            .iter()
            .find_map(|f| f.clone().ok())
            .ok_or(GeolocationError::PositionUnavailable);
        Self {
            fixes,
            interval: Duration::from_millis(10),
            supported: true,
            permission: Ok(PermissionState::Prompt),
            first_fix,
            next_watch: AtomicU64::new(1),
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before each replayed fix.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_permission(mut self, permission: Result<PermissionState, GeolocationError>) -> Self {
        self.permission = permission;
        self
    }

    /// Result returned by the one-shot permission request.
    pub fn with_first_fix(mut self, first_fix: Result<Position, GeolocationError>) -> Self {
        self.first_fix = first_fix;
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Number of watches still registered.
    pub fn active_watches(&self) -> usize {
        self.lock_watches().len()
    }

    fn lock_watches(&self) -> std::sync::MutexGuard<'_, HashMap<WatchId, JoinHandle<()>>> {
        self.watches.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Geolocator for ReplayGeolocator {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn permission_state(&self) -> Result<PermissionState, GeolocationError> {
        self.permission.clone()
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Position, GeolocationError> {
        self.first_fix.clone()
    }

    fn watch_position(
        &self,
        _options: PositionOptions,
        events: mpsc::UnboundedSender<PositionEvent>,
    ) -> WatchId {
        let id = WatchId(self.next_watch.fetch_add(1, Ordering::SeqCst));
        let fixes = self.fixes.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            for fix in fixes {
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                if events.send(fix).is_err() {
                    break;
                }
            }
        });
        self.lock_watches().insert(id, handle);
        id
    }

    fn clear_watch(&self, id: WatchId) {
        if let Some(handle) = self.lock_watches().remove(&id) {
            handle.abort();
        }
    }
}
