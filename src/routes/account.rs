//! Per-user preference and expense routes.

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{BudgetRange, StoredExpense, UserPreference};
use crate::outcome::Outcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/preferences", get(get_preferences).put(save_preferences))
        .route("/api/expenses", post(save_expense))
        .route("/api/expenses/{id}", delete(delete_expense))
        .route("/api/itineraries/{id}/expenses", get(list_expenses))
}

// ─── Preferences ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesBody {
    #[serde(default)]
    preferences: Vec<String>,
    #[serde(default)]
    budget_range: BudgetRange,
    #[serde(default)]
    travel_companions: Vec<String>,
    #[serde(default)]
    special_requests: String,
}

async fn save_preferences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<PreferencesBody>,
) -> Result<Json<Outcome<()>>> {
    if body.budget_range.min > body.budget_range.max {
        return Err(AppError::BadRequest(
            "budgetRange.min must not exceed budgetRange.max".to_string(),
        ));
    }

    let preferences = UserPreference {
        preferences: body.preferences,
        budget_range: body.budget_range,
        travel_companions: body.travel_companions,
        special_requests: body.special_requests,
        ..Default::default()
    };
    Ok(Json(
        state
            .storage
            .save_preferences(user.identity(), &preferences)
            .await,
    ))
}

async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<Outcome<Option<UserPreference>>> {
    Json(state.storage.get_preferences(user.identity()).await)
}

// ─── Expenses ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ExpenseBody {
    #[validate(length(min = 1, max = 200))]
    name: String,
    #[validate(range(min = 0.0))]
    amount: f64,
    date: String,
    #[serde(default)]
    category: String,
    #[validate(length(min = 1))]
    itinerary_id: String,
}

async fn save_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<ExpenseBody>,
) -> Result<Json<Outcome<String>>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let expense = StoredExpense {
        id: String::new(),
        name: body.name,
        amount: body.amount,
        date: body.date,
        category: body.category,
        user_id: String::new(),
        itinerary_id: body.itinerary_id,
        created_at: String::new(),
    };
    Ok(Json(state.storage.save_expense(user.identity(), &expense).await))
}

async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(itinerary_id): Path<String>,
) -> Json<Outcome<Vec<StoredExpense>>> {
    Json(state.storage.list_expenses(user.identity(), &itinerary_id).await)
}

async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Outcome<bool>>> {
    let outcome = state.storage.delete_expense(user.identity(), &id).await;
    if !outcome.value && !outcome.is_degraded() {
        return Err(AppError::NotFound(format!("Expense {} not found", id)));
    }
    Ok(Json(outcome))
}
