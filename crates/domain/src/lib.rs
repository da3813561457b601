//! Domain layer for the Location Share backend.
//!
//! This crate contains:
//! - Domain models (Session, LocationReport, dashboard snapshots)
//! - Storage seams (`SessionStore`, `LocationFeed`) and an in-memory implementation
//! - The realtime change feed
//! - The session, participant tracking and dashboard flows

pub mod models;
pub mod services;
