//! Integration tests for the session location feed endpoints.

mod common;

use axum::http::{header, StatusCode};
use common::{get_request, location_body, parse_response_body, test_config_with, TestApp};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_report_location_success() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app.report(&id, location_body("Ann", 37.7749, -122.4194)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["location"]["session_id"], id);
    assert_eq!(body["location"]["participant_name"], "Ann");
    assert_eq!(body["location"]["accuracy"], 12.0);
    assert_eq!(app.store.location_count().await, 1);
}

#[tokio::test]
async fn test_report_location_without_name_or_accuracy() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app
        .report(&id, json!({ "latitude": 1.5, "longitude": 2.5 }))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert!(body["location"]["participant_name"].is_null());
    assert!(body["location"]["accuracy"].is_null());
}

#[tokio::test]
async fn test_report_location_unknown_session() {
    let app = TestApp::new();

    let response = app
        .report(&Uuid::new_v4().to_string(), location_body("Ann", 1.0, 2.0))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.location_count().await, 0);
}

#[tokio::test]
async fn test_report_location_inactive_session() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;
    assert!(app.store.set_active(id.parse().unwrap(), false).await);

    let response = app.report(&id, location_body("Ann", 1.0, 2.0)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.location_count().await, 0);
}

#[tokio::test]
async fn test_report_location_invalid_latitude() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app.report(&id, location_body("Ann", 91.0, 2.0)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(app.store.location_count().await, 0);
}

#[tokio::test]
async fn test_report_location_negative_accuracy() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    let response = app
        .report(
            &id,
            json!({ "latitude": 1.0, "longitude": 2.0, "accuracy": -3.0 }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_burst_of_fixes_all_stored_by_default() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;
    let names = ["Ann", "Bob", "Cid"];

    for fix in 0..130 {
        let name = names[fix % names.len()];
        let response = app
            .report(&id, location_body(name, 37.0 + fix as f64 * 0.001, -122.0))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "fix {}", fix);
    }

    assert_eq!(app.store.location_count().await, 130);
}

#[tokio::test]
async fn test_opt_in_rate_limit_is_per_participant() {
    let app = TestApp::with_config(test_config_with(&[(
        "security.location_rate_limit_per_minute",
        "2",
    )]));
    let id = app.create_session_id("Field Trip").await;

    for _ in 0..2 {
        let response = app.report(&id, location_body("Ann", 1.0, 2.0)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.report(&id, location_body("Ann", 1.0, 2.0)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Another participant of the same session keeps their own quota.
    let response = app.report(&id, location_body("Bob", 1.0, 2.0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.store.location_count().await, 3);
}

#[tokio::test]
async fn test_list_locations_newest_first() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;

    for (name, ts) in [
        ("Ann", "2025-01-01T10:00:00Z"),
        ("Bob", "2025-01-01T10:02:00Z"),
        ("Cy", "2025-01-01T10:01:00Z"),
    ] {
        let response = app
            .report(
                &id,
                json!({
                    "participant_name": name,
                    "latitude": 1.0,
                    "longitude": 2.0,
                    "timestamp": ts
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .send(get_request(&format!("/api/v1/sessions/{}/locations", id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["participant_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob", "Cy", "Ann"]);
}

#[tokio::test]
async fn test_list_locations_unknown_session() {
    let app = TestApp::new();

    let response = app
        .send(get_request(&format!(
            "/api/v1/sessions/{}/locations",
            Uuid::new_v4()
        )))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_publishes_to_live_subscribers() {
    let app = TestApp::new();
    let id = app.create_session_id("Field Trip").await;
    let mut subscription = app.state.changes.subscribe(id.parse().unwrap()).await;

    let response = app.report(&id, location_body("Ann", 1.0, 2.0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let event = tokio::time::timeout(std::time::Duration::from_secs(1), subscription.recv())
        .await
        .expect("no live event")
        .expect("feed closed");
    assert_eq!(event.new.participant_name.as_deref(), Some("Ann"));
}
