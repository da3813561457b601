//! Integration tests for session endpoints.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{get_request, json_request, parse_response_body, session_from, TestApp};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use serde_json::json;

#[tokio::test]
async fn test_create_session_success() {
    let app = TestApp::new();

    let body = app.create_session("Field Trip").await;
    let session = session_from(&body);

    assert_eq!(session.session_name, "Field Trip");
    assert!(session.is_active);
    assert_eq!(session.expires_at - session.created_at, Duration::hours(24));
    assert_eq!(
        body["tracking_url"],
        format!("http://share.test/track/{}", session.id)
    );
    assert_eq!(
        body["dashboard_url"],
        format!("http://share.test/dashboard/{}", session.id)
    );
}

#[tokio::test]
async fn test_create_session_stores_name_as_entered() {
    let app = TestApp::new();
    let name = format!("  {}  ", CompanyName().fake::<String>());

    let body = app.create_session(&name).await;

    assert_eq!(session_from(&body).session_name, name);
}

#[tokio::test]
async fn test_create_session_blank_name_rejected() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/sessions",
            json!({ "session_name": "   " }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_create_session_with_admin_email() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/sessions",
            json!({ "session_name": "Hike", "admin_email": "lead@example.com" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["session"]["admin_email"], "lead@example.com");
}

#[tokio::test]
async fn test_create_session_free_text_admin_email() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/sessions",
            json!({ "session_name": "Field Trip", "admin_email": "ops team" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["session"]["admin_email"], "ops team");
}

#[tokio::test]
async fn test_create_session_long_name() {
    let app = TestApp::new();
    let name = "Field Trip ".repeat(20);

    let body = app.create_session(&name).await;

    assert_eq!(session_from(&body).session_name, name);
}

#[tokio::test]
async fn test_get_session_roundtrip() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app
        .send(get_request(&format!("/api/v1/sessions/{}", id)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["id"], id);
    assert_eq!(body["session_name"], "Field Trip");
}

#[tokio::test]
async fn test_get_unknown_session_not_found() {
    let app = TestApp::new();

    let response = app
        .send(get_request(&format!(
            "/api/v1/sessions/{}",
            uuid::Uuid::new_v4()
        )))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["message"], "Session Not Found");
}

#[tokio::test]
async fn test_get_malformed_session_id_not_found() {
    let app = TestApp::new();

    let response = app.send(get_request("/api/v1/sessions/not-a-uuid")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
