// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary generation: completion client, progress extraction and the
//! locally generated fallback itinerary.

use crate::error::AppError;
use crate::models::{itinerary::local_id, Activity, Itinerary, ItineraryDay, ItineraryRequest};
use crate::outcome::{Outcome, Warning, WarningKind};
use crate::services::completion::CompletionClient;
use crate::services::extractor::{
    assemble_itinerary, days_from_completion, parse_completion, ProgressTracker,
};
use serde_json::Value;

const FALLBACK_COST_RATIO: f64 = 0.8;

/// Generates itineraries, falling back to local data where allowed.
#[derive(Clone)]
pub struct PlannerService {
    completion: CompletionClient,
}

impl PlannerService {
    pub fn new(completion: CompletionClient) -> Self {
        Self { completion }
    }

    pub fn completion(&self) -> &CompletionClient {
        &self.completion
    }

    /// Generate an itinerary in one request.
    ///
    /// Never fails: missing credentials, transport errors and unparseable
    /// output all produce the fallback itinerary with a warning.
    pub async fn generate(&self, request: &ItineraryRequest) -> Outcome<Itinerary> {
        if !self.completion.is_configured() {
            tracing::warn!("Completion not configured, using fallback itinerary");
            return Outcome::degraded(
                fallback_itinerary(request),
                Warning::new(WarningKind::Fallback, "未配置大语言模型服务，已生成示例行程"),
            );
        }

        let text = match self.completion.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Itinerary completion failed, using fallback");
                return Outcome::degraded(
                    fallback_itinerary(request),
                    Warning::new(WarningKind::Fallback, "行程生成服务暂时不可用，已生成示例行程"),
                );
            }
        };

        let Some(json) = parse_completion(&text) else {
            tracing::warn!("Completion was not valid JSON, using fallback itinerary");
            return Outcome::degraded(
                fallback_itinerary(request),
                Warning::new(WarningKind::Fallback, "行程数据解析失败，已生成示例行程"),
            );
        };

        let mut itinerary = fallback_itinerary(request);
        if let Some(cost) = json
            .get("estimatedCost")
            .and_then(Value::as_f64)
            .filter(|c| *c > 0.0)
        {
            itinerary.estimated_cost = cost;
        } else {
            itinerary.estimated_cost = request.budget;
        }

        // A completion without a day list keeps the fallback days.
        if json.get("itinerary").and_then(Value::as_array).is_some() {
            itinerary.days = days_from_completion(&json);
        }

        Outcome::ok(itinerary)
    }

    /// Generate an itinerary over the streaming endpoint.
    ///
    /// `on_progress` receives the refreshed progress summary after every
    /// fragment. Missing credentials produce the fallback itinerary with a
    /// warning, and output that is not JSON an itinerary without days with a
    /// warning; any other failure is returned as an error.
    pub async fn generate_streaming<F>(
        &self,
        request: &ItineraryRequest,
        mut on_progress: F,
    ) -> Result<Outcome<Itinerary>, AppError>
    where
        F: FnMut(&str) + Send,
    {
        if !self.completion.is_configured() {
            tracing::warn!("Completion not configured, using fallback itinerary");
            return Ok(Outcome::degraded(
                fallback_itinerary(request),
                Warning::new(WarningKind::Fallback, "未配置大语言模型服务，已生成示例行程"),
            ));
        }

        let mut tracker = ProgressTracker::new();
        self.completion
            .stream_itinerary(request, |fragment| on_progress(tracker.push(fragment)))
            .await?;

        let itinerary = assemble_itinerary(request, tracker.buffer());
        tracing::info!(
            days = itinerary.days.len(),
            estimated_cost = itinerary.estimated_cost,
            "Streamed itinerary assembled"
        );
        if parse_completion(tracker.buffer()).is_none() {
            return Ok(Outcome::degraded(
                itinerary,
                Warning::new(WarningKind::Failed, "行程数据解析失败，请重新生成"),
            ));
        }
        Ok(Outcome::ok(itinerary))
    }
}

/// Build an itinerary locally from the request alone.
///
/// One day per calendar day in the range (inclusive), each with activities
/// chosen from the preference keywords. The estimated cost is 80% of the
/// budget, rounded.
pub fn fallback_itinerary(request: &ItineraryRequest) -> Itinerary {
    let activities = fallback_activities(&request.preferences);

    let days = request
        .start_date
        .iter_days()
        .take(request.day_count() as usize)
        .enumerate()
        .map(|(i, date)| ItineraryDay {
            day: i as u32 + 1,
            date: date.format("%Y-%m-%d").to_string(),
            activities: activities.clone(),
        })
        .collect();

    Itinerary {
        id: local_id("itinerary"),
        title: request.itinerary_title(),
        destination: request.destination.clone(),
        start_date: request.start_date.format("%Y-%m-%d").to_string(),
        end_date: request.end_date.format("%Y-%m-%d").to_string(),
        budget: request.budget,
        estimated_cost: (request.budget * FALLBACK_COST_RATIO).round(),
        days,
    }
}

fn fallback_activities(preferences: &str) -> Vec<Activity> {
    let activity = |time: &str, title: &str, description: &str, location: &str, duration: &str, cost: f64| Activity {
        time: time.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        location: location.to_string(),
        duration: duration.to_string(),
        cost: Some(cost),
    };

    let mut activities = Vec::new();

    if preferences.contains("美食") {
        activities.push(activity("12:00", "当地特色餐厅", "品尝当地特色美食", "市中心美食街", "1.5小时", 150.0));
    }
    if preferences.contains("文化") || preferences.contains("历史") {
        activities.push(activity("10:00", "博物馆参观", "了解当地历史文化", "市立博物馆", "2小时", 80.0));
    }
    if preferences.contains("自然") || preferences.contains("风景") {
        activities.push(activity("14:00", "自然公园游览", "欣赏自然美景", "城市公园", "2小时", 0.0));
    }
    if activities.is_empty() {
        activities.push(activity("09:00", "城市观光", "开始一天的城市探索", "市中心", "1小时", 0.0));
    }

    activities
}
