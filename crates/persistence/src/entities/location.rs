//! Location entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the locations table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationEntity {
    pub id: Uuid,
    pub session_id: Uuid,
    pub participant_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<LocationEntity> for domain::models::LocationReport {
    fn from(entity: LocationEntity) -> Self {
        Self {
            id: entity.id,
            session_id: entity.session_id,
            participant_name: entity.participant_name,
            latitude: entity.latitude,
            longitude: entity.longitude,
            accuracy: entity.accuracy,
            timestamp: entity.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_report_keeps_anonymous() {
        let entity = LocationEntity {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            participant_name: None,
            latitude: 37.7749,
            longitude: -122.4194,
            accuracy: None,
            timestamp: Utc::now(),
        };
        let report: domain::models::LocationReport = entity.clone().into();
        assert_eq!(report.id, entity.id);
        assert!(report.participant_name.is_none());
        assert_eq!(report.display_name(), "Anonymous");
        assert_eq!(report.latitude, 37.7749);
    }
}
