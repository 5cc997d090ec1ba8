// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary generation routes.

use crate::error::{AppError, Result};
use crate::models::{Itinerary, ItineraryRequest};
use crate::outcome::Outcome;
use crate::services::speech::{parse_transcript, TripDraft};
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use validator::Validate;

/// Shown to the user when streaming generation fails outright.
const GENERATION_FAILED: &str = "生成失败，请重试";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/plan", post(plan))
        .route("/api/plan/stream", post(plan_stream))
        .route("/api/speech/parse", post(parse_speech))
}

fn validated(request: ItineraryRequest) -> Result<ItineraryRequest> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(request)
}

/// Generate an itinerary in one request. Falls back to a locally built
/// itinerary when the completion service is missing or fails.
async fn plan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ItineraryRequest>,
) -> Result<Json<Outcome<Itinerary>>> {
    let request = validated(request)?;
    tracing::info!(destination = %request.destination, days = request.day_count(), "Planning itinerary");
    Ok(Json(state.planner.generate(&request).await))
}

#[derive(Serialize)]
struct ProgressEvent<'a> {
    summary: &'a str,
}

#[derive(Serialize)]
struct ErrorEvent {
    error: &'static str,
    details: String,
}

/// Generate an itinerary over server-sent events.
///
/// Emits a `progress` event with the refreshed summary after every received
/// fragment, then exactly one `itinerary` or `error` event.
async fn plan_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ItineraryRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let request = validated(request)?;
    tracing::info!(destination = %request.destination, days = request.day_count(), "Streaming itinerary");

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let planner = state.planner.clone();

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let result = planner
            .generate_streaming(&request, |summary| {
                if let Ok(event) = Event::default()
                    .event("progress")
                    .json_data(ProgressEvent { summary })
                {
                    // The client may have gone away; generation still completes.
                    let _ = progress_tx.send(event);
                }
            })
            .await;

        let event = match result {
            Ok(outcome) => Event::default().event("itinerary").json_data(&outcome),
            Err(e) => {
                tracing::error!(error = %e, "Streaming generation failed");
                Event::default().event("error").json_data(ErrorEvent {
                    error: GENERATION_FAILED,
                    details: e.to_string(),
                })
            }
        };
        match event {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode final event"),
        }
    });

    let events = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ─── Voice Form Fill ─────────────────────────────────────────

#[derive(Deserialize)]
struct SpeechRequest {
    transcript: String,
}

async fn parse_speech(Json(body): Json<SpeechRequest>) -> Result<Json<TripDraft>> {
    let transcript = body.transcript.trim();
    if transcript.is_empty() {
        return Err(AppError::BadRequest("transcript is empty".to_string()));
    }
    Ok(Json(parse_transcript(transcript)))
}
