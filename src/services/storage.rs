// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence of itineraries, preferences and expenses.
//!
//! Every operation needs a signed-in user. None of them fail: anonymous
//! callers and store failures get a safe default plus a warning, and saves
//! hand back a local placeholder ID so the caller can keep working.
//!
//! Documents belonging to another user are treated as absent.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::middleware::Identity;
use crate::models::itinerary::{is_local_id, local_id};
use crate::models::{Itinerary, StoredExpense, StoredItinerary, UserPreference};
use crate::outcome::{Outcome, Warning};
use crate::time_utils::{format_currency, now_rfc3339};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone)]
pub struct StorageService {
    db: FirestoreDb,
}

impl StorageService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    // ─── Itineraries ─────────────────────────────────────────────

    /// Save an itinerary and return its identifier.
    ///
    /// An itinerary with a durable ID replaces the caller's stored document,
    /// keeping its creation time. One with a local ID, or with the ID of
    /// another user's document, gets a fresh durable ID.
    pub async fn save_itinerary(
        &self,
        identity: Option<&Identity>,
        itinerary: &Itinerary,
    ) -> Outcome<String> {
        let Some(identity) = identity else {
            tracing::info!("Not signed in, itinerary kept local");
            return Outcome::degraded(
                local_id("itinerary"),
                Warning::not_signed_in("请先登录，行程将不会保存到云端"),
            );
        };

        match self.write_itinerary(identity, itinerary).await {
            Ok(id) => {
                tracing::info!(user_id = %identity.user_id, itinerary_id = %id, "Itinerary saved");
                Outcome::ok(id)
            }
            Err(e) => degrade(
                local_id("itinerary"),
                &e,
                "网络连接问题，行程将不会保存到云端",
                "保存行程到云端失败",
            ),
        }
    }

    async fn write_itinerary(&self, identity: &Identity, itinerary: &Itinerary) -> Result<String, AppError> {
        let mut itinerary = itinerary.clone();
        itinerary.recompute_estimated_cost();

        let now = now_rfc3339();
        let existing = if itinerary.has_local_id() {
            None
        } else {
            self.db.get_itinerary(&itinerary.id).await?
        };
        let created_at = match existing {
            Some(existing) if existing.user_id == identity.user_id => Some(existing.created_at),
            Some(_) => {
                tracing::warn!(
                    user_id = %identity.user_id,
                    itinerary_id = %itinerary.id,
                    "Itinerary owned by another user, saving as new"
                );
                itinerary.id = uuid::Uuid::new_v4().to_string();
                None
            }
            None if itinerary.has_local_id() => {
                itinerary.id = uuid::Uuid::new_v4().to_string();
                None
            }
            None => None,
        }
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| now.clone());

        let id = itinerary.id.clone();
        let stored = StoredItinerary::new(itinerary, &identity.user_id, &created_at, &now);
        self.db.set_itinerary(&id, &normalize_document(&stored)?).await?;
        Ok(id)
    }

    /// Fetch an itinerary if it belongs to `identity`.
    async fn owned_itinerary(
        &self,
        identity: &Identity,
        id: &str,
    ) -> Result<Option<StoredItinerary>, AppError> {
        let stored = self.db.get_itinerary(id).await?;
        Ok(stored.filter(|s| s.user_id == identity.user_id))
    }

    /// The user's itineraries, most recently updated first.
    pub async fn list_itineraries(&self, identity: Option<&Identity>) -> Outcome<Vec<StoredItinerary>> {
        let Some(identity) = identity else {
            return Outcome::degraded(Vec::new(), Warning::not_signed_in("请先登录，无法获取行程列表"));
        };

        match self.db.get_itineraries_for_user(&identity.user_id).await {
            Ok(mut itineraries) => {
                itineraries
                    .iter_mut()
                    .for_each(StoredItinerary::recompute_estimated_cost);
                tracing::debug!(user_id = %identity.user_id, count = itineraries.len(), "Listed itineraries");
                Outcome::ok(itineraries)
            }
            Err(e) => degrade(Vec::new(), &e, "网络连接问题，无法获取行程列表", "获取行程列表失败"),
        }
    }

    /// Load one itinerary. A local ID was never stored, so it is `None`
    /// without a lookup.
    pub async fn get_itinerary(&self, identity: Option<&Identity>, id: &str) -> Outcome<Option<Itinerary>> {
        let Some(identity) = identity else {
            return Outcome::degraded(None, Warning::not_signed_in("请先登录，无法获取行程"));
        };
        if is_local_id(id) {
            return Outcome::ok(None);
        }

        match self.owned_itinerary(identity, id).await {
            Ok(stored) => Outcome::ok(stored.map(|s| s.to_itinerary())),
            Err(e) => degrade(None, &e, "网络连接问题，无法获取行程", "获取行程失败"),
        }
    }

    /// Apply a partial update to a stored itinerary.
    ///
    /// `patch` is merged member by member into the stored document; a null
    /// member removes that field. Ownership and timestamps cannot be
    /// patched. Returns the updated itinerary, or `None` if it does not exist.
    pub async fn update_itinerary(
        &self,
        identity: Option<&Identity>,
        id: &str,
        patch: &Value,
    ) -> Outcome<Option<Itinerary>> {
        let Some(identity) = identity else {
            return Outcome::degraded(None, Warning::not_signed_in("请先登录，行程将不会更新到云端"));
        };
        if is_local_id(id) {
            return Outcome::ok(None);
        }

        match self.merge_itinerary(identity, id, patch).await {
            Ok(updated) => {
                if updated.is_some() {
                    tracing::info!(user_id = %identity.user_id, itinerary_id = id, "Itinerary updated");
                }
                Outcome::ok(updated)
            }
            Err(e) => degrade(None, &e, "网络连接问题，行程将不会更新到云端", "更新行程失败"),
        }
    }

    async fn merge_itinerary(
        &self,
        identity: &Identity,
        id: &str,
        patch: &Value,
    ) -> Result<Option<Itinerary>, AppError> {
        let Some(existing) = self.owned_itinerary(identity, id).await? else {
            return Ok(None);
        };
        let Value::Object(changes) = patch else {
            return Err(AppError::MalformedData("update must be a JSON object".to_string()));
        };

        let mut document = serde_json::to_value(&existing)
            .map_err(|e| AppError::MalformedData(e.to_string()))?;
        if let Value::Object(fields) = &mut document {
            for (key, value) in changes {
                if matches!(key.as_str(), "id" | "userId" | "createdAt" | "updatedAt") {
                    continue;
                }
                if value.is_null() {
                    fields.remove(key);
                } else {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }

        let mut merged: StoredItinerary = serde_json::from_value(document)
            .map_err(|e| AppError::MalformedData(format!("invalid itinerary update: {}", e)))?;
        merged.id = id.to_string();
        merged.updated_at = now_rfc3339();
        merged.recompute_estimated_cost();

        self.db.set_itinerary(id, &normalize_document(&merged)?).await?;
        Ok(Some(merged.to_itinerary()))
    }

    /// Delete one of the caller's itineraries. The value is `false` when
    /// there was no such itinerary.
    pub async fn delete_itinerary(&self, identity: Option<&Identity>, id: &str) -> Outcome<bool> {
        let Some(identity) = identity else {
            return Outcome::degraded(false, Warning::not_signed_in("请先登录，无法删除行程"));
        };
        if is_local_id(id) {
            return Outcome::ok(true);
        }

        let result = match self.owned_itinerary(identity, id).await {
            Ok(Some(_)) => self.db.delete_itinerary(id).await.map(|()| true),
            Ok(None) => Ok(false),
            Err(e) => Err(e),
        };

        match result {
            Ok(deleted) => {
                if deleted {
                    tracing::info!(user_id = %identity.user_id, itinerary_id = id, "Itinerary deleted");
                }
                Outcome::ok(deleted)
            }
            Err(e) => degrade(false, &e, "网络连接问题，行程将不会从云端删除", "删除行程失败"),
        }
    }

    // ─── Preferences ─────────────────────────────────────────────

    pub async fn save_preferences(
        &self,
        identity: Option<&Identity>,
        preferences: &UserPreference,
    ) -> Outcome<()> {
        let Some(identity) = identity else {
            return Outcome::degraded((), Warning::not_signed_in("请先登录，偏好设置将不会保存到云端"));
        };

        let document = UserPreference {
            user_id: identity.user_id.clone(),
            updated_at: now_rfc3339(),
            ..preferences.clone()
        };
        let result = match normalize_document(&document) {
            Ok(doc) => self.db.set_preferences(&identity.user_id, &doc).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(user_id = %identity.user_id, "Preferences saved");
                Outcome::ok(())
            }
            Err(e) => degrade((), &e, "网络连接问题，偏好设置将不会保存到云端", "保存用户偏好设置失败"),
        }
    }

    pub async fn get_preferences(&self, identity: Option<&Identity>) -> Outcome<Option<UserPreference>> {
        let Some(identity) = identity else {
            return Outcome::degraded(None, Warning::not_signed_in("请先登录，无法获取偏好设置"));
        };

        match self.db.get_preferences(&identity.user_id).await {
            Ok(preferences) => Outcome::ok(preferences),
            Err(e) => degrade(None, &e, "网络连接问题，无法获取用户偏好设置", "获取用户偏好设置失败"),
        }
    }

    // ─── Expenses ────────────────────────────────────────────────

    /// Record an expense and return its identifier.
    pub async fn save_expense(&self, identity: Option<&Identity>, expense: &StoredExpense) -> Outcome<String> {
        let Some(identity) = identity else {
            return Outcome::degraded(
                local_id("expense"),
                Warning::not_signed_in("请先登录，费用记录将不会保存到云端"),
            );
        };

        let document = StoredExpense {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            created_at: now_rfc3339(),
            ..expense.clone()
        };
        let result = match normalize_document(&document) {
            Ok(doc) => self.db.set_expense(&document.id, &doc).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    user_id = %identity.user_id,
                    itinerary_id = %document.itinerary_id,
                    amount = %format_currency(document.amount),
                    "Expense saved"
                );
                Outcome::ok(document.id)
            }
            Err(e) => degrade(
                local_id("expense"),
                &e,
                "网络连接问题，费用记录将不会保存到云端",
                "保存费用记录到云端失败",
            ),
        }
    }

    pub async fn list_expenses(
        &self,
        identity: Option<&Identity>,
        itinerary_id: &str,
    ) -> Outcome<Vec<StoredExpense>> {
        let Some(identity) = identity else {
            return Outcome::degraded(Vec::new(), Warning::not_signed_in("请先登录，无法获取费用记录"));
        };

        match self
            .db
            .get_expenses_for_itinerary(&identity.user_id, itinerary_id)
            .await
        {
            Ok(expenses) => Outcome::ok(expenses),
            Err(e) => degrade(Vec::new(), &e, "网络连接问题，无法获取费用记录", "获取费用记录失败"),
        }
    }

    /// Delete one of the caller's expenses. The value is `false` when there
    /// was no such expense.
    pub async fn delete_expense(&self, identity: Option<&Identity>, id: &str) -> Outcome<bool> {
        let Some(identity) = identity else {
            return Outcome::degraded(false, Warning::not_signed_in("请先登录，无法删除费用记录"));
        };
        if is_local_id(id) {
            return Outcome::ok(true);
        }

        let result = match self.db.get_expense(id).await {
            Ok(Some(expense)) if expense.user_id == identity.user_id => {
                self.db.delete_expense(id).await.map(|()| true)
            }
            Ok(_) => Ok(false),
            Err(e) => Err(e),
        };

        match result {
            Ok(deleted) => {
                if deleted {
                    tracing::info!(user_id = %identity.user_id, expense_id = id, "Expense deleted");
                }
                Outcome::ok(deleted)
            }
            Err(e) => degrade(false, &e, "网络连接问题，费用记录将不会从云端删除", "删除费用记录失败"),
        }
    }
}

fn degrade<T>(value: T, err: &AppError, offline: &str, failed: &str) -> Outcome<T> {
    tracing::warn!(error = %err, "Storage operation failed, degrading");
    Outcome::degraded(value, Warning::from_error(err, offline, failed))
}

/// Serialize a document for the store with every null member removed, at
/// any depth.
pub fn normalize_document<T: Serialize>(document: &T) -> Result<Value, AppError> {
    let mut value =
        serde_json::to_value(document).map_err(|e| AppError::MalformedData(e.to_string()))?;
    strip_nulls(&mut value);
    Ok(value)
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            fields.retain(|_, v| !v.is_null());
            fields.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
