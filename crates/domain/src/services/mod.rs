//! Domain services for Location Share.
//!
//! Services contain the session, reporting and dashboard flows plus the
//! storage and realtime seams they run on.

pub mod dashboard;
pub mod realtime;
pub mod sessions;
pub mod store;
pub mod tracking;

pub use dashboard::{DashboardMount, DashboardView, DashboardViewer, LiveDashboard};
pub use realtime::{ChangeEvent, ChangeFeed, ChangeKind, LiveLocationFeed, Subscription};
pub use sessions::{SessionError, SessionLookup, SessionService};
pub use store::{InMemoryStore, LocationFeed, SessionStore, StoreError};
pub use tracking::{
    GeolocationError, Geolocator, Notice, ParticipantTracker, PermissionState, Position,
    PositionEvent, PositionOptions, ReplayGeolocator, TrackingError, TrackingState, WatchId,
};
