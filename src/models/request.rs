//! Trip request submitted by the planner form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest trip that can be planned, in days.
pub const MAX_TRIP_DAYS: i64 = 30;

/// Parameters for generating one itinerary. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_date_range"))]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ItineraryRequest {
    #[validate(length(min = 1, max = 100))]
    pub destination: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_date: NaiveDate,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_date: NaiveDate,
    #[validate(range(min = 0.0))]
    pub budget: f64,
    #[validate(range(min = 1, max = 100))]
    pub travelers: u32,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub preferences: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
}

impl ItineraryRequest {
    /// Number of calendar days covered, inclusive of both ends.
    pub fn day_count(&self) -> u32 {
        let days = (self.end_date - self.start_date).num_days() + 1;
        days.max(0) as u32
    }

    /// Title used for itineraries generated from this request.
    pub fn itinerary_title(&self) -> String {
        let destination = if self.destination.is_empty() {
            "我的"
        } else {
            self.destination.as_str()
        };
        format!("{}旅行计划", destination)
    }
}

fn validate_date_range(request: &ItineraryRequest) -> Result<(), ValidationError> {
    if request.end_date < request.start_date {
        return Err(ValidationError::new("end_date_before_start_date"));
    }
    if (request.end_date - request.start_date).num_days() + 1 > MAX_TRIP_DAYS {
        return Err(ValidationError::new("trip_too_long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> ItineraryRequest {
        ItineraryRequest {
            destination: "北京".to_string(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            budget: 5000.0,
            travelers: 2,
            preferences: "文化".to_string(),
            special_requests: None,
        }
    }

    #[test]
    fn test_day_count_is_inclusive() {
        assert_eq!(request("2025-01-01", "2025-01-03").day_count(), 3);
        assert_eq!(request("2025-01-01", "2025-01-01").day_count(), 1);
    }

    #[test]
    fn test_rejects_reversed_range() {
        assert!(request("2025-01-03", "2025-01-01").validate().is_err());
        assert!(request("2025-01-01", "2025-01-03").validate().is_ok());
    }

    #[test]
    fn test_rejects_trips_longer_than_a_month() {
        assert!(request("2025-01-01", "2025-01-30").validate().is_ok());
        assert!(request("2025-01-01", "2025-01-31").validate().is_err());
        assert!(request("0001-01-01", "9999-12-31").validate().is_err());
    }

    #[test]
    fn test_rejects_zero_travelers_and_empty_destination() {
        let mut req = request("2025-01-01", "2025-01-02");
        req.travelers = 0;
        assert!(req.validate().is_err());

        let mut req = request("2025-01-01", "2025-01-02");
        req.destination.clear();
        assert!(req.validate().is_err());
    }
}
