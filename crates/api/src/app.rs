use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    ChangeFeed, DashboardViewer, InMemoryStore, LiveLocationFeed, LocationFeed, SessionService,
    SessionStore,
};
use persistence::repositories::{LocationRepository, SessionRepository};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id, RateLimiterState};
use crate::routes::{dashboard, health, live, locations, pages, sessions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SessionStore>,
    pub sessions: SessionService,
    /// Location feed that publishes every append to `changes`.
    pub locations: Arc<dyn LocationFeed>,
    pub changes: ChangeFeed,
    pub rate_limiter: Arc<RateLimiterState>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        feed: Arc<dyn LocationFeed>,
    ) -> Self {
        let config = Arc::new(config);
        let changes = ChangeFeed::new(config.realtime.channel_capacity);
        let locations: Arc<dyn LocationFeed> =
            Arc::new(LiveLocationFeed::new(feed, changes.clone()));
        let sessions = SessionService::new(Arc::clone(&store), config.public_base_url());
        let rate_limiter = Arc::new(RateLimiterState::new(
            config.security.location_rate_limit_per_minute,
        ));

        Self {
            config,
            store,
            sessions,
            locations,
            changes,
            rate_limiter,
        }
    }

    /// State backed by the Postgres repositories.
    pub fn with_pool(config: Config, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(SessionRepository::new(pool.clone())),
            Arc::new(LocationRepository::new(pool)),
        )
    }

    /// State backed by one shared in-memory store.
    pub fn in_memory(config: Config, store: InMemoryStore) -> Self {
        Self::new(config, Arc::new(store.clone()), Arc::new(store))
    }

    /// Viewer behind the live route, capped per session by `limits`.
    pub fn dashboard_viewer(&self) -> DashboardViewer {
        DashboardViewer::new(
            self.sessions.clone(),
            Arc::clone(&self.locations),
            self.changes.clone(),
        )
        .with_subscriber_limit(self.config.limits.max_live_subscribers_per_session)
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    create_router(AppState::with_pool(config, pool))
}

pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .route("/api/v1/sessions", post(sessions::create_session))
        .route("/api/v1/sessions/:session_id", get(sessions::get_session))
        .route(
            "/api/v1/sessions/:session_id/locations",
            post(locations::report_location).get(locations::list_locations),
        )
        .route(
            "/api/v1/sessions/:session_id/dashboard",
            get(dashboard::get_dashboard),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    // Long-lived WebSocket upgrades stay outside the request timeout.
    let live_routes = Router::new().route("/api/v1/sessions/:session_id/live", get(live::live_updates));

    let page_routes = Router::new()
        .route("/track/:session_id", get(pages::tracking_page))
        .route("/dashboard/:session_id", get(pages::dashboard_page));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(live_routes)
        .merge(page_routes)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
