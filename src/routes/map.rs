// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map display and place lookup routes.

use crate::error::{AppError, Result};
use crate::models::{Itinerary, MapLocation};
use crate::outcome::Outcome;
use crate::services::map::{ContainerSize, InteractiveMap, MapClientConfig, MapScene};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/map/render", post(render_day))
        .route("/api/map/focus", post(focus))
        .route("/api/map/resize", post(resize))
        .route("/api/map/config", get(client_config))
        .route("/api/map/scene.geojson", get(scene_geojson))
        .route("/api/locations", get(search_locations))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest {
    container: String,
    itinerary: Itinerary,
    day_index: usize,
}

/// Draw one day of an itinerary.
async fn render_day(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RenderRequest>,
) -> Result<Json<Outcome<Option<MapScene>>>> {
    let outcome = state
        .viewer
        .render_day(&body.container, &body.itinerary, body.day_index)
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct FocusRequest {
    location: String,
}

async fn focus(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FocusRequest>,
) -> Json<Outcome<Option<InteractiveMap>>> {
    Json(state.viewer.focus(&body.location).await)
}

#[derive(Deserialize)]
struct ResizeRequest {
    container: String,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct ResizeResponse {
    scheduled: bool,
}

/// Report a container's layout size.
async fn resize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResizeRequest>,
) -> Json<ResizeResponse> {
    let size = ContainerSize {
        width: body.width,
        height: body.height,
    };
    let scheduled = state.map.notify_container_resized(&body.container, size).await;
    Json(ResizeResponse { scheduled })
}

/// Browser SDK settings; `null` when no map key is configured.
async fn client_config(State(state): State<Arc<AppState>>) -> Json<Option<MapClientConfig>> {
    Json(MapClientConfig::from_config(&state.config))
}

/// The current map as GeoJSON.
async fn scene_geojson(State(state): State<Arc<AppState>>) -> Result<Json<geojson::FeatureCollection>> {
    let scene = state
        .map
        .current_scene()
        .await
        .ok_or_else(|| AppError::NotFound("No map has been rendered".to_string()))?;
    Ok(Json(scene.to_geojson()))
}

#[derive(Deserialize)]
struct LocationQuery {
    #[serde(default)]
    q: String,
}

async fn search_locations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> Json<Vec<MapLocation>> {
    Json(state.resolver.search(&query.q).await)
}
