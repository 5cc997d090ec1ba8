// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress extraction from a partially received itinerary completion.
//!
//! The completion endpoint streams a JSON document a few characters at a time.
//! Until it is complete, the buffer is not valid JSON, so progress is scraped
//! with patterns instead: the estimated cost, each day header, and the
//! activity titles under it. The summary is advisory only. The final
//! itinerary comes from parsing the whole buffer once the stream ends.

use crate::models::{Itinerary, ItineraryDay, ItineraryRequest};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Shown when nothing recognizable has arrived yet.
pub const GENERATING_PLACEHOLDER: &str = "正在生成行程计划...";
/// Shown under a day header that has no activity titles yet.
pub const DAY_PENDING_PLACEHOLDER: &str = "  正在生成活动安排...";

fn cost_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""estimatedCost"\s*:\s*(\d+)"#).expect("valid cost regex"))
}

fn day_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)"day"\s*:\s*(\d+).*?"date"\s*:\s*"([^"]+)""#).expect("valid day regex")
    })
}

fn title_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""title"\s*:\s*"([^"]+)""#).expect("valid title regex"))
}

/// Render the progress summary for everything received so far.
///
/// This re-scans the whole buffer on every call, so matches that straddle
/// fragment boundaries are never missed.
pub fn summarize_progress(buffer: &str) -> String {
    let mut summary = String::new();

    if let Some(caps) = cost_pattern().captures(buffer) {
        summary.push_str(&format!("预估费用: ¥{}\n\n", &caps[1]));
    }

    let mut pos = 0;
    while let Some(caps) = day_pattern().captures_at(buffer, pos) {
        let Some(whole) = caps.get(0) else { break };
        summary.push_str(&format!("第{}天 ({})\n", &caps[1], &caps[2]));

        // Titles belong to this day until the next day header starts.
        let span_start = whole.end();
        let span_end = day_pattern()
            .find_at(buffer, span_start)
            .map(|next| next.start())
            .unwrap_or(buffer.len());

        let mut has_titles = false;
        for title in title_pattern().captures_iter(&buffer[span_start..span_end]) {
            summary.push_str(&format!("  - {}\n", &title[1]));
            has_titles = true;
        }
        if !has_titles {
            summary.push_str(DAY_PENDING_PLACEHOLDER);
            summary.push('\n');
        }
        summary.push('\n');

        pos = span_start;
    }

    if summary.trim().is_empty() {
        return GENERATING_PLACEHOLDER.to_string();
    }
    summary
}

/// Accumulates streamed fragments and keeps the current progress summary.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    buffer: String,
    summary: String,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the refreshed summary.
    pub fn push(&mut self, fragment: &str) -> &str {
        self.buffer.push_str(fragment);
        self.summary = summarize_progress(&self.buffer);
        &self.summary
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn into_buffer(self) -> String {
        self.buffer
    }
}

/// Parse a complete completion buffer as a JSON object.
///
/// Tries the whole trimmed text first, then the outermost brace-delimited
/// substring (models sometimes wrap the JSON in prose or code fences).
pub fn parse_completion(buffer: &str) -> Option<Value> {
    let text = buffer.trim();

    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => return Some(value),
        Ok(_) => tracing::debug!("Completion parsed but is not an object"),
        Err(e) => tracing::debug!(error = %e, "Direct completion parse failed"),
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse completion JSON");
            None
        }
    }
}

/// Extract the days from a parsed completion.
///
/// Days that do not deserialize are skipped rather than failing the lot.
pub fn days_from_completion(json: &Value) -> Vec<ItineraryDay> {
    let Some(days) = json.get("itinerary").and_then(Value::as_array) else {
        return Vec::new();
    };

    days.iter()
        .filter_map(|day| match serde_json::from_value::<ItineraryDay>(day.clone()) {
            Ok(day) => Some(day),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed itinerary day");
                None
            }
        })
        .collect()
}

/// Build the final itinerary from the complete buffer.
///
/// If the buffer cannot be parsed the itinerary has no days; this never fails.
/// The completion's estimated cost is kept as a seed value (falling back to
/// the budget when absent or zero).
pub fn assemble_itinerary(request: &ItineraryRequest, buffer: &str) -> Itinerary {
    let mut itinerary = Itinerary {
        id: crate::models::itinerary::local_id("itinerary"),
        title: request.itinerary_title(),
        destination: request.destination.clone(),
        start_date: request.start_date.format("%Y-%m-%d").to_string(),
        end_date: request.end_date.format("%Y-%m-%d").to_string(),
        budget: request.budget,
        estimated_cost: 0.0,
        days: Vec::new(),
    };

    if let Some(json) = parse_completion(buffer) {
        itinerary.estimated_cost = json
            .get("estimatedCost")
            .and_then(Value::as_f64)
            .filter(|cost| *cost > 0.0)
            .unwrap_or(request.budget);
        itinerary.days = days_from_completion(&json);
    } else {
        tracing::warn!(
            len = buffer.len(),
            "Completion was not valid JSON, returning itinerary without days"
        );
    }

    itinerary
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"{"estimatedCost":3000,"itinerary":[
        {"day":1,"date":"2025-01-01","activities":[
            {"time":"09:00","title":"天安门广场","location":"天安门广场","cost":0},
            {"time":"12:00","title":"故宫博物院","location":"故宫博物院","cost":60}]},
        {"day":2,"date":"2025-01-02","activities":[
            {"time":"09:30","title":"颐和园","location":"颐和园","cost":30}]}]}"#;

    fn lines(summary: &str) -> Vec<&str> {
        summary.lines().filter(|l| !l.trim().is_empty()).collect()
    }

    #[test]
    fn test_truncated_buffer() {
        let buffer = r#"{"estimatedCost":3000,"itinerary":[{"day":1,"date":"2025-01-01","activities":[{"title":"A"}]}"#;
        let summary = summarize_progress(buffer);
        assert_eq!(
            lines(&summary),
            vec!["预估费用: ¥3000", "第1天 (2025-01-01)", "  - A"]
        );
    }

    #[test]
    fn test_empty_buffer_shows_generating() {
        assert_eq!(summarize_progress(""), GENERATING_PLACEHOLDER);
        assert_eq!(summarize_progress(r#"{"estim"#), GENERATING_PLACEHOLDER);
    }

    #[test]
    fn test_day_without_titles_gets_placeholder() {
        let buffer = r#"{"itinerary":[{"day":1,"date":"2025-01-01","activities":[{"time":"09:00","#;
        let summary = summarize_progress(buffer);
        assert_eq!(
            lines(&summary),
            vec!["第1天 (2025-01-01)", DAY_PENDING_PLACEHOLDER]
        );
    }

    #[test]
    fn test_titles_are_assigned_to_their_day() {
        let summary = summarize_progress(COMPLETE);
        assert_eq!(
            lines(&summary),
            vec![
                "预估费用: ¥3000",
                "第1天 (2025-01-01)",
                "  - 天安门广场",
                "  - 故宫博物院",
                "第2天 (2025-01-02)",
                "  - 颐和园",
            ]
        );
    }

    #[test]
    fn test_full_buffer_is_superset_of_every_prefix() {
        let full: Vec<String> = lines(&summarize_progress(COMPLETE))
            .into_iter()
            .map(String::from)
            .collect();

        let mut tracker = ProgressTracker::new();
        let chars: Vec<char> = COMPLETE.chars().collect();
        for chunk in chars.chunks(7) {
            let fragment: String = chunk.iter().collect();
            let summary = tracker.push(&fragment).to_string();
            for line in lines(&summary) {
                if line == GENERATING_PLACEHOLDER || line == DAY_PENDING_PLACEHOLDER {
                    continue;
                }
                assert!(full.iter().any(|l| l == line), "unexpected line {line:?}");
            }
        }
        assert_eq!(tracker.buffer(), COMPLETE);
        assert_eq!(tracker.summary(), summarize_progress(COMPLETE));
    }

    #[test]
    fn test_parse_completion_direct_and_embedded() {
        assert!(parse_completion(COMPLETE).is_some());

        let fenced = format!("```json\n{}\n```", COMPLETE);
        let parsed = parse_completion(&fenced).expect("embedded JSON");
        assert_eq!(parsed["estimatedCost"], 3000);

        assert!(parse_completion("not json at all").is_none());
        assert!(parse_completion(r#"{"estimatedCost":3000,"itinerary":["#).is_none());
        assert!(parse_completion("} backwards {").is_none());
    }

    #[test]
    fn test_assemble_itinerary() {
        let request = ItineraryRequest {
            destination: "北京".to_string(),
            start_date: "2025-01-01".parse().unwrap(),
            end_date: "2025-01-02".parse().unwrap(),
            budget: 5000.0,
            travelers: 2,
            preferences: String::new(),
            special_requests: None,
        };

        let itinerary = assemble_itinerary(&request, COMPLETE);
        assert_eq!(itinerary.title, "北京旅行计划");
        assert_eq!(itinerary.estimated_cost, 3000.0);
        assert_eq!(itinerary.days.len(), 2);
        assert_eq!(itinerary.days[0].activities[1].cost, Some(60.0));
        assert!(itinerary.has_local_id());

        let broken = assemble_itinerary(&request, r#"{"itinerary":[{"day":1"#);
        assert!(broken.days.is_empty());
        assert_eq!(broken.start_date, "2025-01-01");
    }
}
