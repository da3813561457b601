//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod location;
pub mod session;

pub use location::LocationEntity;
pub use session::TrackingSessionEntity;
