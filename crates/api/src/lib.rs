pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
