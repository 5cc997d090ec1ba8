//! Documents persisted in Firestore.

use crate::models::{Itinerary, ItineraryDay};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Itinerary document, keyed by its durable identifier.
///
/// Field names match [`Itinerary`]'s wire form plus the ownership fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StoredItinerary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default, rename = "itinerary")]
    pub days: Vec<ItineraryDay>,
    /// Owner's identity-provider user ID
    pub user_id: String,
    /// When first saved (ISO 8601)
    #[serde(default)]
    pub created_at: String,
    /// When last saved (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl StoredItinerary {
    pub fn new(itinerary: Itinerary, user_id: &str, created_at: &str, updated_at: &str) -> Self {
        Self {
            id: itinerary.id,
            title: itinerary.title,
            destination: itinerary.destination,
            start_date: itinerary.start_date,
            end_date: itinerary.end_date,
            budget: itinerary.budget,
            estimated_cost: itinerary.estimated_cost,
            days: itinerary.days,
            user_id: user_id.to_string(),
            created_at: created_at.to_string(),
            updated_at: updated_at.to_string(),
        }
    }

    /// Replace the stored estimated cost with the sum of activity costs.
    pub fn recompute_estimated_cost(&mut self) {
        self.estimated_cost = self.days.iter().map(ItineraryDay::cost).sum();
    }

    /// The itinerary part of the document.
    ///
    /// The stored estimated cost is only a seed; it is recomputed here.
    pub fn to_itinerary(&self) -> Itinerary {
        let mut itinerary = Itinerary {
            id: self.id.clone(),
            title: self.title.clone(),
            destination: self.destination.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            budget: self.budget,
            estimated_cost: self.estimated_cost,
            days: self.days.clone(),
        };
        itinerary.recompute_estimated_cost();
        itinerary
    }
}

/// Per-user planning preferences (one document per user).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserPreference {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub budget_range: BudgetRange,
    #[serde(default)]
    pub travel_companions: Vec<String>,
    #[serde(default)]
    pub special_requests: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
}

/// A recorded trip expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StoredExpense {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub category: String,
    #[serde(default)]
    pub user_id: String,
    pub itinerary_id: String,
    #[serde(default)]
    pub created_at: String,
}
