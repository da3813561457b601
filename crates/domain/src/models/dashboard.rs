//! Dashboard view models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::LocationReport;

/// One rendered location line on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub id: Uuid,
    pub participant: String,
    pub latitude: f64,
    pub longitude: f64,
    pub coordinates: String,
    pub map_url: String,
    /// Rounded accuracy label, omitted when accuracy is missing or zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub time_ago: String,
}

impl LocationEntry {
    pub fn from_report(report: &LocationReport, now: DateTime<Utc>) -> Self {
        Self {
            id: report.id,
            participant: report.display_name().to_string(),
            latitude: report.latitude,
            longitude: report.longitude,
            coordinates: shared::links::format_coordinates(report.latitude, report.longitude),
            map_url: shared::links::map_url(report.latitude, report.longitude),
            accuracy: report
                .accuracy
                .filter(|a| *a != 0.0)
                .map(shared::links::format_accuracy),
            timestamp: report.timestamp,
            time_ago: crate::services::dashboard::time_ago(report.timestamp, now),
        }
    }
}

/// Point-in-time rendering of a session dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub total_locations: usize,
    pub active_participants: usize,
    pub last_update: String,
    pub latest_locations: Vec<LocationEntry>,
    pub recent_locations: Vec<LocationEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
}
