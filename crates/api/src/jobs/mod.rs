//! Background job scheduler and job implementations.

mod cleanup_sessions;
mod pool_metrics;
mod scheduler;

pub use cleanup_sessions::CleanupSessionsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
