// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Itinerary model: days, activities, and the derived estimated cost.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Prefix of locally generated itinerary identifiers.
pub const LOCAL_ITINERARY_PREFIX: &str = "local_itinerary_";

/// One scheduled activity within a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Activity {
    /// Time of day (e.g. "09:00")
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Place name, used as the location resolver key
    #[serde(default)]
    pub location: String,
    /// Free-text duration (e.g. "2小时")
    #[serde(default)]
    pub duration: String,
    /// Cost in yuan; absent means unknown and counts as zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// One day of an itinerary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ItineraryDay {
    /// 1-based day index
    pub day: u32,
    /// Calendar date ("YYYY-MM-DD")
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl ItineraryDay {
    /// Sum of activity costs for this day.
    pub fn cost(&self) -> f64 {
        self.activities.iter().map(|a| a.cost.unwrap_or(0.0)).sum()
    }
}

/// A complete itinerary.
///
/// `estimated_cost` is derived from the activity costs. A value received from
/// the completion endpoint or the store is only a seed; every local mutation
/// goes through a method that recomputes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Itinerary {
    pub id: String,
    pub title: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: f64,
    pub estimated_cost: f64,
    #[serde(default, rename = "itinerary")]
    pub days: Vec<ItineraryDay>,
}

impl Itinerary {
    /// Sum of all activity costs across all days.
    pub fn total_activity_cost(&self) -> f64 {
        self.days.iter().map(ItineraryDay::cost).sum()
    }

    /// Recompute `estimated_cost` from the activities and return it.
    pub fn recompute_estimated_cost(&mut self) -> f64 {
        self.estimated_cost = self.total_activity_cost();
        self.estimated_cost
    }

    /// Set the cost of one activity and recompute the estimated cost.
    ///
    /// `day_index` and `activity_index` are 0-based positions.
    pub fn set_activity_cost(
        &mut self,
        day_index: usize,
        activity_index: usize,
        cost: f64,
    ) -> Result<f64, ItineraryError> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(ItineraryError::InvalidCost(cost));
        }

        let activity = self
            .days
            .get_mut(day_index)
            .ok_or(ItineraryError::DayOutOfRange(day_index))?
            .activities
            .get_mut(activity_index)
            .ok_or(ItineraryError::ActivityOutOfRange {
                day_index,
                activity_index,
            })?;
        activity.cost = Some(cost);

        Ok(self.recompute_estimated_cost())
    }

    /// Replace every day and recompute the estimated cost.
    pub fn replace_days(&mut self, days: Vec<ItineraryDay>) {
        self.days = days;
        self.recompute_estimated_cost();
    }

    /// Whether the identifier was generated locally rather than by the store.
    pub fn has_local_id(&self) -> bool {
        is_local_id(&self.id)
    }
}

/// Whether an identifier is a local placeholder rather than a durable one.
pub fn is_local_id(id: &str) -> bool {
    id.is_empty() || id.starts_with("local_")
}

/// Generate a timestamp-derived placeholder identifier.
pub fn local_id(kind: &str) -> String {
    format!("local_{}_{}", kind, chrono::Utc::now().timestamp_millis())
}

/// Errors from local itinerary edits.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ItineraryError {
    #[error("Day {0} does not exist")]
    DayOutOfRange(usize),

    #[error("Activity {activity_index} does not exist on day {day_index}")]
    ActivityOutOfRange {
        day_index: usize,
        activity_index: usize,
    },

    #[error("Cost must be a non-negative number, got {0}")]
    InvalidCost(f64),
}
