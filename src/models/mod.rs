// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod itinerary;
pub mod location;
pub mod request;
pub mod stored;

pub use itinerary::{Activity, Itinerary, ItineraryDay, ItineraryError};
pub use location::MapLocation;
pub use request::ItineraryRequest;
pub use stored::{BudgetRange, StoredExpense, StoredItinerary, UserPreference};
