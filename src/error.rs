// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Completion API error: {0}")]
    Completion(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error came from an unreachable network peer or backend.
    ///
    /// Callers degrade these to a user-visible warning instead of failing.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_) | AppError::Database(_) | AppError::Completion(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::ConfigMissing(name) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "config_missing",
                Some(name.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Completion(msg) => {
                (StatusCode::BAD_GATEWAY, "completion_error", Some(msg.clone()))
            }
            AppError::Transport(msg) => {
                (StatusCode::BAD_GATEWAY, "transport_error", Some(msg.clone()))
            }
            AppError::MalformedData(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed_data",
                Some(msg.clone()),
            ),
            AppError::CapabilityUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "capability_unavailable",
                Some(msg.clone()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
