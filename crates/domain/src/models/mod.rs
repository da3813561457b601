//! Domain models for Location Share.

pub mod dashboard;
pub mod location;
pub mod session;

pub use dashboard::{DashboardSnapshot, LocationEntry};
pub use location::{LocationReport, NewLocationReport};
pub use session::{NewSession, Session};
