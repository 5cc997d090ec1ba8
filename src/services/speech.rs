//! Voice form fill: pull planner form fields out of a spoken request.
//!
//! Recognition itself happens in the browser; this only interprets the
//! transcript.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Destinations recognized in a transcript, checked in this order.
const KNOWN_CITIES: &[&str] = &[
    "北京", "上海", "杭州", "成都", "西安", "广州", "深圳", "厦门", "青岛", "大连", "三亚",
];

const TRAVELER_PHRASES: &[(&[&str], u32)] = &[
    (&["一个人", "我自己", "我一人"], 1),
    (&["两个人", "两人", "我和"], 2),
    (&["三个人", "三人"], 3),
    (&["四个人", "四人"], 4),
];

fn amount_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)(?:元|块钱|块)?").expect("valid amount regex"))
}

/// Form fields suggested by a transcript. Absent fields are left for the
/// user to fill in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<u64>,
    pub travelers: u32,
    pub special_requests: String,
}

pub fn parse_transcript(text: &str) -> TripDraft {
    let destination = KNOWN_CITIES
        .iter()
        .find(|city| text.contains(*city))
        .map(|city| city.to_string());

    let budget = amount_pattern()
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .filter(|b| *b > 0);

    let travelers = TRAVELER_PHRASES
        .iter()
        .find(|(phrases, _)| phrases.iter().any(|p| text.contains(p)))
        .map_or(1, |(_, count)| *count);

    tracing::debug!(?destination, ?budget, travelers, "Parsed transcript");

    TripDraft {
        destination,
        budget,
        travelers,
        special_requests: text.to_string(),
    }
}
