// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Travel Planner API Server
//!
//! Generates trip itineraries with a hosted language model, renders each
//! day's route on a map and stores itineraries for signed-in users.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_planner::{config::Config, db::FirestoreDb, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Travel Planner API");

    // Without a project the store runs offline and saves stay local
    let db = match &config.gcp_project_id {
        Some(project_id) => FirestoreDb::new(project_id).await?,
        None => FirestoreDb::new_mock(),
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db));
    tracing::info!(
        completion = state.planner.completion().is_configured(),
        map_key = config.amap_api_key.is_some(),
        "Services initialized"
    );

    // Build router
    let app = travel_planner::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("travel_planner=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
