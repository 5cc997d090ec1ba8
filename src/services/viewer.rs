//! Itinerary display flow: resolve a day's places and draw them on the map.

use crate::error::AppError;
use crate::models::{Itinerary, MapLocation};
use crate::outcome::{Outcome, Warning, WarningKind};
use crate::services::geocode::LocationResolver;
use crate::services::map::{InteractiveMap, MapGateway, MapScene};
use std::time::Duration;

/// Wait between checks for a container that has not been laid out yet.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);
pub const MAX_SETTLE_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct ItineraryViewer {
    resolver: LocationResolver,
    map: MapGateway,
}

impl ItineraryViewer {
    pub fn new(resolver: LocationResolver, map: MapGateway) -> Self {
        Self { resolver, map }
    }

    /// Draw one day's activities, in order, as a numbered route.
    ///
    /// Activities whose place cannot be resolved are skipped. If none
    /// resolve, nothing is drawn and a warning is returned.
    pub async fn render_day(
        &self,
        container: &str,
        itinerary: &Itinerary,
        day_index: usize,
    ) -> Result<Outcome<Option<MapScene>>, AppError> {
        let day = itinerary
            .days
            .get(day_index)
            .ok_or_else(|| AppError::NotFound(format!("Day {} not in itinerary", day_index)))?;

        let mut locations = Vec::with_capacity(day.activities.len());
        for activity in &day.activities {
            match self.resolver.locate(&activity.location).await {
                Some(location) => locations.push(MapLocation {
                    title: Some(activity.title.clone()).filter(|t| !t.is_empty()),
                    description: Some(activity.description.clone()).filter(|d| !d.is_empty()),
                    ..location
                }),
                None => tracing::debug!(location = %activity.location, "Skipping unresolved activity"),
            }
        }

        if locations.is_empty() {
            tracing::info!(day = day.day, "No resolvable locations, not rendering map");
            return Ok(Outcome::degraded(
                None,
                Warning::new(
                    WarningKind::LocationUnresolved,
                    "无法获取地点信息，地图渲染已取消",
                ),
            ));
        }

        self.wait_for_layout(container).await;

        tracing::info!(day = day.day, locations = locations.len(), "Rendering day on map");
        Ok(self
            .map
            .render_route(container, &locations)
            .await
            .map(Some))
    }

    /// Resolve a place name and center the map on it.
    pub async fn focus(&self, location_name: &str) -> Outcome<Option<InteractiveMap>> {
        if self.map.readiness().await.is_none() {
            return Outcome::degraded(
                None,
                Warning::new(WarningKind::MapUnavailable, "地图正在初始化，请稍后再试"),
            );
        }

        let Some(location) = self.resolver.locate(location_name).await else {
            return Outcome::degraded(
                None,
                Warning::new(WarningKind::LocationUnresolved, "无法获取地点信息"),
            );
        };

        match self.map.focus_on_location(&location).await {
            Some(scene) => Outcome::ok(Some(scene)),
            None => Outcome::degraded(
                None,
                Warning::new(WarningKind::MapUnavailable, "地图尚未就绪，无法定位地点"),
            ),
        }
    }

    /// Give a freshly shown container a moment to get a size. A container
    /// the client never reported is assumed ready; after the last attempt
    /// the render goes ahead regardless.
    async fn wait_for_layout(&self, container: &str) {
        for attempt in 1..=MAX_SETTLE_ATTEMPTS {
            match self.map.container_size(container).await {
                Some(size) if size.is_empty() => {
                    tracing::debug!(container, attempt, "Map container has no size yet, waiting");
                    tokio::time::sleep(SETTLE_DELAY).await;
                }
                _ => return,
            }
        }
    }
}
