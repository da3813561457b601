//! Repository implementations for database operations.
//!
//! Both repositories implement the domain storage traits so the services can
//! run against Postgres or the in-memory store interchangeably.

pub mod location;
pub mod session;

pub use location::LocationRepository;
pub use session::SessionRepository;

use domain::services::StoreError;

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a sqlx error onto the storage error seen by the domain.
pub(crate) fn store_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            StoreError::ForeignKey(db.message().to_string())
        }
        _ => StoreError::Backend(e.to_string()),
    }
}
