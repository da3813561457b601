//! Shared utilities and common types for the Location Share backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic
//! - Tracking/dashboard link derivation and coordinate formatting

pub mod links;
pub mod validation;
