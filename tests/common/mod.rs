// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use std::sync::Arc;
use travel_planner::config::Config;
use travel_planner::db::FirestoreDb;
use travel_planner::middleware::identity::create_token;
use travel_planner::routes::create_router;
use travel_planner::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with offline dependencies and the given config.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, FirestoreDb::new_mock()));
    (create_router(state.clone()), state)
}

/// Create a test app with no credentials and an offline store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// Session token for a user, signed with the test config's key.
#[allow(dead_code)]
pub fn session_token(user_id: &str) -> String {
    let config = Config::test_default();
    let key = config
        .identity_signing_key
        .expect("test config has a signing key");
    create_token(user_id, &key).expect("Failed to create token")
}

/// JSON POST/PUT/PATCH request, optionally signed in.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// A valid planning request body.
#[allow(dead_code)]
pub fn plan_body() -> serde_json::Value {
    serde_json::json!({
        "destination": "杭州",
        "startDate": "2025-05-01",
        "endDate": "2025-05-03",
        "budget": 3000,
        "travelers": 2,
        "preferences": "美食, 自然"
    })
}
