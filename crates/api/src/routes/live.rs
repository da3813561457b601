//! Live subscription over WebSocket.
//!
//! Each connection mounts a [`LiveDashboard`] for the session and forwards every
//! insert it applies as a JSON text frame. Client frames other than close are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use chrono::Utc;
use domain::services::{DashboardMount, LiveDashboard};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session_id_from_path;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{live_subscriber_connected, live_subscriber_disconnected};

/// GET /api/v1/sessions/:session_id/live
pub async fn live_updates(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let id = session_id_from_path(&session_id)?;

    // Mounted before the upgrade so no insert after this point is missed.
    let dashboard = match state.dashboard_viewer().mount(id, Utc::now()).await {
        DashboardMount::Live(dashboard) => dashboard,
        DashboardMount::NotFound => return Err(ApiError::session_not_found()),
        DashboardMount::Full => {
            warn!(
                session_id = %id,
                limit = state.config.limits.max_live_subscribers_per_session,
                "Live subscriber limit reached"
            );
            return Err(ApiError::RateLimited {
                retry_after_secs: 5,
            });
        }
    };

    let Some(ws) = ws else {
        dashboard.unmount().await;
        return Err(ApiError::Validation("WebSocket upgrade required".into()));
    };

    let ping_interval = Duration::from_secs(state.config.realtime.ping_interval_secs.max(1));
    Ok(ws.on_upgrade(move |socket| serve_live(socket, id, dashboard, ping_interval)))
}

async fn serve_live(
    socket: WebSocket,
    session_id: Uuid,
    mut dashboard: LiveDashboard,
    ping_interval: Duration,
) {
    live_subscriber_connected();
    info!(
        session_id = %session_id,
        topic = dashboard.topic().unwrap_or_default(),
        loaded = dashboard.view().total_locations(),
        "Live subscriber connected"
    );

    let (mut sink, mut stream) = socket.split();
    let mut ping = tokio::time::interval(ping_interval);
    ping.tick().await;

    loop {
        tokio::select! {
            event = dashboard.next_change() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&event) {
                    Ok(text) => Message::Text(text),
                    Err(e) => {
                        warn!(error = %e, "Failed to encode change event");
                        continue;
                    }
                };
                if sink.send(frame).await.is_err() {
                    debug!(session_id = %session_id, "Client went away while sending");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let seen = dashboard.view().total_locations();
    dashboard.unmount().await;
    live_subscriber_disconnected();
    info!(session_id = %session_id, seen, "Live subscriber disconnected");
}
