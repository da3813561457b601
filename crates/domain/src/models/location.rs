//! Location report domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Display name used for reports without a participant name.
pub const ANONYMOUS: &str = "Anonymous";

/// One timestamped position fix tied to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    pub id: Uuid,
    pub session_id: Uuid,
    pub participant_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationReport {
    /// Grouping key for "latest per participant": the name, or a per-row key when anonymous.
    pub fn participant_key(&self) -> String {
        match self.participant_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("anonymous-{}", self.id),
        }
    }

    pub fn display_name(&self) -> &str {
        match self.participant_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        }
    }
}

/// Values written when a report row is appended. The id is generated by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocationReport {
    pub session_id: Uuid,
    pub participant_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Request payload for appending a report to a session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportLocationRequest {
    pub participant_name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(range(min = 0.0, message = "Accuracy must be non-negative"))]
    pub accuracy: Option<f64>,

    /// Client-side fix time; the server clock is used when omitted.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReportLocationRequest {
    pub fn into_new_report(self, session_id: Uuid, now: DateTime<Utc>) -> NewLocationReport {
        NewLocationReport {
            session_id,
            participant_name: self.participant_name,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

impl From<&NewLocationReport> for ReportLocationRequest {
    fn from(report: &NewLocationReport) -> Self {
        Self {
            participant_name: report.participant_name.clone(),
            latitude: report.latitude,
            longitude: report.longitude,
            accuracy: report.accuracy,
            timestamp: Some(report.timestamp),
        }
    }
}

/// Response payload for a report upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportLocationResponse {
    pub success: bool,
    pub location: LocationReport,
}
