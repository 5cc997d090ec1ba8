// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod completion;
pub mod extractor;
pub mod geocode;
pub mod map;
pub mod planner;
pub mod speech;
pub mod storage;
pub mod viewer;

pub use completion::CompletionClient;
pub use geocode::LocationResolver;
pub use map::{MapClientConfig, MapGateway};
pub use planner::PlannerService;
pub use storage::StorageService;
pub use viewer::ItineraryViewer;
