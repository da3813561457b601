//! Integration tests for the dashboard snapshot and live subscription endpoints.

mod common;

use axum::http::StatusCode;
use common::{get_request, location_body, parse_response_body, TestApp};
use uuid::Uuid;

#[tokio::test]
async fn test_dashboard_empty_session() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app
        .send(get_request(&format!("/api/v1/sessions/{}/dashboard", id)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["session"]["id"], id);
    assert_eq!(body["dashboard"]["total_locations"], 0);
    assert_eq!(body["dashboard"]["active_participants"], 0);
    assert_eq!(
        body["dashboard"]["empty_message"],
        "No locations received yet. Share the tracking link to start receiving data."
    );
}

#[tokio::test]
async fn test_dashboard_latest_per_participant() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;
    app.report(&id, location_body("Ann", 1.0, 1.0)).await;
    app.report(&id, location_body("Ann", 2.0, 2.0)).await;
    app.report(&id, location_body("Bob", 3.0, 3.0)).await;

    let response = app
        .send(get_request(&format!("/api/v1/sessions/{}/dashboard", id)))
        .await;

    let body = parse_response_body(response).await;
    let dashboard = &body["dashboard"];
    assert_eq!(dashboard["total_locations"], 3);
    assert_eq!(dashboard["active_participants"], 2);
    assert_eq!(dashboard["recent_locations"].as_array().unwrap().len(), 3);
    assert_eq!(dashboard["latest_locations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_dashboard_unknown_session() {
    let app = TestApp::new();

    let response = app
        .send(get_request(&format!(
            "/api/v1/sessions/{}/dashboard",
            Uuid::new_v4()
        )))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_unknown_session_not_found() {
    let app = TestApp::new();

    let response = app
        .send(get_request(&format!(
            "/api/v1/sessions/{}/live",
            Uuid::new_v4()
        )))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_requires_websocket_upgrade() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app
        .send(get_request(&format!("/api/v1/sessions/{}/live", id)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let session_id: Uuid = id.parse().unwrap();
    assert_eq!(app.state.changes.subscriber_count(session_id).await, 0);
}
