// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved itinerary routes.

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Itinerary, StoredItinerary};
use crate::outcome::Outcome;
use crate::time_utils::format_currency;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/itineraries", get(list_itineraries).post(save_itinerary))
        .route(
            "/api/itineraries/{id}",
            get(get_itinerary)
                .patch(update_itinerary)
                .delete(delete_itinerary),
        )
        .route("/api/itineraries/{id}/cost", put(set_activity_cost))
}

/// `None` with no warning means the itinerary does not exist.
fn found<T>(outcome: Outcome<Option<T>>, id: &str) -> Result<Json<Outcome<Option<T>>>> {
    if outcome.value.is_none() && !outcome.is_degraded() {
        return Err(AppError::NotFound(format!("Itinerary {} not found", id)));
    }
    Ok(Json(outcome))
}

/// Save an itinerary. Returns its identifier, which is a local placeholder
/// when nothing was persisted.
async fn save_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(itinerary): Json<Itinerary>,
) -> Json<Outcome<String>> {
    Json(state.storage.save_itinerary(user.identity(), &itinerary).await)
}

async fn list_itineraries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<Outcome<Vec<StoredItinerary>>> {
    Json(state.storage.list_itineraries(user.identity()).await)
}

async fn get_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Outcome<Option<Itinerary>>>> {
    found(state.storage.get_itinerary(user.identity(), &id).await, &id)
}

async fn update_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Outcome<Option<Itinerary>>>> {
    if !patch.is_object() {
        return Err(AppError::BadRequest("update must be a JSON object".to_string()));
    }
    found(
        state.storage.update_itinerary(user.identity(), &id, &patch).await,
        &id,
    )
}

async fn delete_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Outcome<bool>>> {
    let outcome = state.storage.delete_itinerary(user.identity(), &id).await;
    if !outcome.value && !outcome.is_degraded() {
        return Err(AppError::NotFound(format!("Itinerary {} not found", id)));
    }
    Ok(Json(outcome))
}

// ─── Cost Editing ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostEdit {
    day_index: usize,
    activity_index: usize,
    cost: f64,
    /// Itinerary being edited, for callers holding one that was never
    /// stored. Otherwise it is loaded by ID. A durable ID here must match
    /// the path.
    #[serde(default)]
    itinerary: Option<Itinerary>,
}

/// Set one activity's cost, recompute the estimated cost and save.
async fn set_activity_cost(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(edit): Json<CostEdit>,
) -> Result<Json<Outcome<Itinerary>>> {
    let mut itinerary = match edit.itinerary {
        Some(itinerary) if !itinerary.has_local_id() && itinerary.id != id => {
            return Err(AppError::BadRequest(format!(
                "itinerary ID {} does not match {}",
                itinerary.id, id
            )));
        }
        Some(itinerary) => itinerary,
        None => {
            let loaded = state.storage.get_itinerary(user.identity(), &id).await;
            match loaded.value {
                Some(itinerary) => itinerary,
                None => {
                    let reason = loaded
                        .warning
                        .map(|w| w.message)
                        .unwrap_or_else(|| format!("Itinerary {} not found", id));
                    return Err(AppError::NotFound(reason));
                }
            }
        }
    };

    let estimated_cost = itinerary
        .set_activity_cost(edit.day_index, edit.activity_index, edit.cost)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    tracing::info!(
        itinerary_id = %itinerary.id,
        day_index = edit.day_index,
        activity_index = edit.activity_index,
        estimated_cost = %format_currency(estimated_cost),
        "Activity cost updated"
    );

    let saved = state.storage.save_itinerary(user.identity(), &itinerary).await;
    // A durable ID survives a failed save; a local one takes the new ID.
    if !saved.is_degraded() || itinerary.has_local_id() {
        itinerary.id = saved.value;
    }

    Ok(Json(Outcome {
        value: itinerary,
        warning: saved.warning,
    }))
}
