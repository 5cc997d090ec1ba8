// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Itineraries (one document per saved trip, owned by a user)
//! - User preferences (one document per user)
//! - Expenses (owned by a user, grouped by itinerary)
//!
//! Writes take an already-normalized JSON document so that absent optional
//! members are never stored as explicit nulls.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{StoredExpense, StoredItinerary, UserPreference};
use serde_json::Value;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client.
    ///
    /// Used when no project is configured and in tests. Every operation
    /// returns [`AppError::Database`], which callers treat as a transport
    /// failure.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Whether a real connection is available.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn set_document(&self, collection: &str, id: &str, document: &Value) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(document)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Itinerary Operations ────────────────────────────────────

    /// Get an itinerary by document ID.
    pub async fn get_itinerary(&self, id: &str) -> Result<Option<StoredItinerary>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ITINERARIES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace an itinerary document.
    pub async fn set_itinerary(&self, id: &str, document: &Value) -> Result<(), AppError> {
        self.set_document(collections::ITINERARIES, id, document).await
    }

    /// Get all itineraries owned by a user, most recently updated first.
    pub async fn get_itineraries_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<StoredItinerary>, AppError> {
        let owner = user_id.to_string();
        let mut itineraries: Vec<StoredItinerary> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ITINERARIES)
            .filter(move |q| q.for_all([q.field("userId").eq(owner.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // RFC 3339 UTC strings sort chronologically. Sorting here avoids a
        // composite index on (userId, updatedAt).
        itineraries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(itineraries)
    }

    /// Delete an itinerary document.
    pub async fn delete_itinerary(&self, id: &str) -> Result<(), AppError> {
        self.delete_document(collections::ITINERARIES, id).await
    }

    // ─── Preference Operations ───────────────────────────────────

    pub async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreference>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_PREFERENCES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_preferences(&self, user_id: &str, document: &Value) -> Result<(), AppError> {
        self.set_document(collections::USER_PREFERENCES, user_id, document)
            .await
    }

    // ─── Expense Operations ──────────────────────────────────────

    pub async fn set_expense(&self, id: &str, document: &Value) -> Result<(), AppError> {
        self.set_document(collections::EXPENSES, id, document).await
    }

    /// Get a user's expenses for one itinerary, newest first.
    pub async fn get_expenses_for_itinerary(
        &self,
        user_id: &str,
        itinerary_id: &str,
    ) -> Result<Vec<StoredExpense>, AppError> {
        let owner = user_id.to_string();
        let itinerary = itinerary_id.to_string();
        let mut expenses: Vec<StoredExpense> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::EXPENSES)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(owner.clone()),
                    q.field("itineraryId").eq(itinerary.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    pub async fn get_expense(&self, id: &str) -> Result<Option<StoredExpense>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::EXPENSES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn delete_expense(&self, id: &str) -> Result<(), AppError> {
        self.delete_document(collections::EXPENSES, id).await
    }
}
