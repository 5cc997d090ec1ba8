// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Travel Planner: generate, display and store trip itineraries
//!
//! This crate provides the backend API: itinerary generation through a
//! streaming language-model completion endpoint, map rendering of each day's
//! route, and per-user storage of itineraries, preferences and expenses.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod outcome;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ItineraryViewer, LocationResolver, MapGateway, PlannerService, StorageService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub planner: PlannerService,
    pub storage: StorageService,
    pub resolver: LocationResolver,
    pub map: MapGateway,
    pub viewer: ItineraryViewer,
}

impl AppState {
    /// Wire every service from the configuration and a store connection.
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let planner = PlannerService::new(services::CompletionClient::from_config(&config));
        let storage = StorageService::new(db.clone());
        let resolver = LocationResolver::from_config(&config);
        let map = MapGateway::from_config(&config);
        let viewer = ItineraryViewer::new(resolver.clone(), map.clone());

        Self {
            config,
            db,
            planner,
            storage,
            resolver,
            map,
            viewer,
        }
    }
}
