//! Link derivation and coordinate formatting shared by the API and clients.

use std::fmt::Display;

/// Path prefix of participant tracking links.
pub const TRACK_PATH: &str = "/track";

/// Path prefix of organizer dashboard links.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Builds the participant link `{base}/track/{id}`.
pub fn tracking_url(base_url: &str, session_id: impl Display) -> String {
    format!("{}{}/{}", trim_base(base_url), TRACK_PATH, session_id)
}

/// Builds the organizer link `{base}/dashboard/{id}`.
pub fn dashboard_url(base_url: &str, session_id: impl Display) -> String {
    format!("{}{}/{}", trim_base(base_url), DASHBOARD_PATH, session_id)
}

/// External map link for a coordinate pair.
pub fn map_url(latitude: f64, longitude: f64) -> String {
    format!("https://maps.google.com/?q={},{}", latitude, longitude)
}

/// Formats a coordinate pair with six decimals, e.g. `"37.774900, -122.419400"`.
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{:.6}, {:.6}", latitude, longitude)
}

/// Formats an accuracy radius as `"±12m"`.
pub fn format_accuracy(accuracy: f64) -> String {
    format!("±{}m", accuracy.round() as i64)
}

fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}
