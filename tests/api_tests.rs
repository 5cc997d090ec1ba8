// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Router tests against an offline app: no completion credentials, no map
//! key and no document store.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, json_request, plan_body, session_token};

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_plan_without_credentials_falls_back() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request("POST", "/api/plan", plan_body(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"]["title"], "杭州旅行计划");
    assert_eq!(body["value"]["estimatedCost"], 2400.0);
    assert_eq!(body["value"]["itinerary"].as_array().unwrap().len(), 3);
    assert_eq!(body["value"]["itinerary"][2]["date"], "2025-05-03");
    assert_eq!(body["warning"]["kind"], "fallback");
}

#[tokio::test]
async fn test_plan_rejects_reversed_dates() {
    let (app, _) = create_test_app();
    let mut body = plan_body();
    body["endDate"] = json!("2025-04-01");

    let response = app
        .oneshot(json_request("POST", "/api/plan", body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_plan_stream_without_credentials_sends_fallback_event() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request("POST", "/api/plan/stream", plan_body(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("event: progress"));
    assert_eq!(text.matches("event: itinerary").count(), 1);
    assert!(text.contains("\"kind\":\"fallback\""));
}

#[tokio::test]
async fn test_speech_parse() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/speech/parse",
            json!({"transcript": "我想去成都，两个人，预算3000元"}),
            None,
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["destination"], "成都");
    assert_eq!(body["budget"], 3000);
    assert_eq!(body["travelers"], 2);
}

#[tokio::test]
async fn test_location_search_uses_builtin_table() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/locations?q={}", urlencoding::encode("上海")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"外滩"));
}

#[tokio::test]
async fn test_anonymous_save_returns_local_id() {
    let (app, _) = create_test_app();
    let itinerary = json!({
        "id": "local_itinerary_1",
        "title": "杭州旅行计划",
        "destination": "杭州",
        "startDate": "2025-05-01",
        "endDate": "2025-05-01",
        "budget": 3000,
        "estimatedCost": 0,
        "itinerary": []
    });

    let response = app
        .oneshot(json_request("POST", "/api/itineraries", itinerary, None))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert!(body["value"].as_str().unwrap().starts_with("local_itinerary_"));
    assert_eq!(body["warning"]["kind"], "not_signed_in");
}

#[tokio::test]
async fn test_signed_in_list_reports_offline_store() {
    let (app, _) = create_test_app();
    let token = session_token("user-7");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/itineraries")
                .header(header::COOKIE, format!("planner_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["value"], json!([]));
    assert_eq!(body["warning"]["kind"], "offline");
}

#[tokio::test]
async fn test_invalid_token_is_anonymous() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/preferences")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["warning"]["kind"], "not_signed_in");
}

#[tokio::test]
async fn test_cost_edit_on_unsaved_itinerary() {
    let (app, _) = create_test_app();
    let edit = json!({
        "dayIndex": 0,
        "activityIndex": 1,
        "cost": 120,
        "itinerary": {
            "id": "local_itinerary_1",
            "title": "北京旅行计划",
            "destination": "北京",
            "startDate": "2025-11-10",
            "endDate": "2025-11-10",
            "budget": 1000,
            "estimatedCost": 999,
            "itinerary": [{
                "day": 1,
                "date": "2025-11-10",
                "activities": [
                    {"title": "天安门广场", "location": "天安门广场", "cost": 0},
                    {"title": "故宫博物院", "location": "故宫博物院", "cost": 60}
                ]
            }]
        }
    });

    let response = app
        .oneshot(json_request("PUT", "/api/itineraries/local_itinerary_1/cost", edit, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"]["estimatedCost"], 120.0);
    assert_eq!(body["value"]["itinerary"][0]["activities"][1]["cost"], 120.0);
    assert_eq!(body["warning"]["kind"], "not_signed_in");
}

#[tokio::test]
async fn test_cost_edit_out_of_range() {
    let (app, _) = create_test_app();
    let edit = json!({
        "dayIndex": 3,
        "activityIndex": 0,
        "cost": 10,
        "itinerary": {
            "id": "local_itinerary_1",
            "title": "t",
            "destination": "北京",
            "startDate": "2025-11-10",
            "endDate": "2025-11-10",
            "budget": 0,
            "estimatedCost": 0,
            "itinerary": []
        }
    });

    let response = app
        .oneshot(json_request("PUT", "/api/itineraries/x/cost", edit, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cost_edit_rejects_mismatched_itinerary_id() {
    let (app, _) = create_test_app();
    let edit = json!({
        "dayIndex": 0,
        "activityIndex": 0,
        "cost": 10,
        "itinerary": {
            "id": "3f2a9c1e-itinerary-a",
            "title": "北京旅行计划",
            "destination": "北京",
            "startDate": "2025-11-10",
            "endDate": "2025-11-10",
            "budget": 0,
            "estimatedCost": 0,
            "itinerary": [{
                "day": 1,
                "date": "2025-11-10",
                "activities": [{"title": "故宫博物院", "location": "故宫博物院", "cost": 60}]
            }]
        }
    });

    let response = app
        .oneshot(json_request("PUT", "/api/itineraries/other-itinerary/cost", edit, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_rejects_overlong_trip() {
    let (app, _) = create_test_app();
    let mut body = plan_body();
    body["startDate"] = json!("0001-01-01");
    body["endDate"] = json!("9999-12-31");

    let response = app
        .oneshot(json_request("POST", "/api/plan", body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_without_sign_in_is_not_a_404() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request("DELETE", "/api/itineraries/abc", json!(null), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"], false);
    assert_eq!(body["warning"]["kind"], "not_signed_in");
}

#[tokio::test]
async fn test_map_render_without_key_shows_placeholder() {
    let (app, _) = create_test_app();
    let body = json!({
        "container": "day-map",
        "dayIndex": 0,
        "itinerary": {
            "id": "local_itinerary_1",
            "title": "杭州旅行计划",
            "destination": "杭州",
            "startDate": "2025-05-01",
            "endDate": "2025-05-01",
            "budget": 1000,
            "estimatedCost": 0,
            "itinerary": [{
                "day": 1,
                "date": "2025-05-01",
                "activities": [
                    {"title": "游西湖", "location": "西湖"},
                    {"title": "灵隐寺祈福", "location": "灵隐寺"}
                ]
            }]
        }
    });

    let response = app
        .oneshot(json_request("POST", "/api/map/render", body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"]["kind"], "placeholder");
    assert_eq!(body["value"]["title"], "高德地图");
    assert_eq!(body["warning"]["kind"], "map_unavailable");
}

#[tokio::test]
async fn test_map_render_missing_day() {
    let (app, _) = create_test_app();
    let body = json!({
        "container": "day-map",
        "dayIndex": 2,
        "itinerary": {
            "id": "local_itinerary_1",
            "title": "t",
            "destination": "杭州",
            "startDate": "2025-05-01",
            "endDate": "2025-05-01",
            "budget": 0,
            "estimatedCost": 0,
            "itinerary": []
        }
    });

    let response = app
        .oneshot(json_request("POST", "/api/map/render", body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_map_config_absent_without_key() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/map/config").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(body_json(response).await, serde_json::Value::Null);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/plan")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}
