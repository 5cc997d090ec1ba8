// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map rendering gateway.
//!
//! Owns the lifecycle of the mapping SDK and the single shared map instance.
//! The SDK is loaded lazily on first use; concurrent callers share the one
//! in-flight load. Renders are executed one at a time in submission order,
//! so requests issued while the SDK is still loading run, in order, as soon
//! as it resolves.
//!
//! When the SDK is unusable at render time the gateway re-initializes it a
//! bounded number of times, then falls back to a static placeholder panel.

use crate::config::Config;
use crate::models::MapLocation;
use crate::outcome::{Outcome, Warning, WarningKind};
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use geo::{Centroid, MultiPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const DEFAULT_ZOOM: u8 = 12;
pub const FOCUS_ZOOM: u8 = 16;
/// Consecutive SDK-availability failures tolerated before giving up.
pub const MAX_LOAD_RETRIES: u32 = 3;
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

pub const DEFAULT_CENTER: LatLng = LatLng {
    latitude: crate::services::geocode::DEFAULT_LATITUDE,
    longitude: crate::services::geocode::DEFAULT_LONGITUDE,
};

const ROUTE_STROKE_COLOR: &str = "#3366FF";
const ROUTE_STROKE_WEIGHT: u8 = 4;
const ROUTE_STROKE_OPACITY: f64 = 0.8;
const POLYLINE_PRECISION: u32 = 5;

const PLACEHOLDER_TITLE: &str = "高德地图";
const PLACEHOLDER_BACKGROUND: &str = "linear-gradient(135deg, #7ec6e9 0%, #2ba7df 100%)";

const AMAP_SCRIPT_URL: &str = "https://webapi.amap.com/maps?v=2.0";
const STATIC_MAP_DEFAULT_SIZE: ContainerSize = ContainerSize {
    width: 750,
    height: 400,
};
/// AMap static maps are limited to 1024x1024.
const STATIC_MAP_MAX_EDGE: u32 = 1024;

// ─── Geometry and Scenes ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn coord(&self) -> geo::Coord<f64> {
        geo::coord! { x: self.longitude, y: self.latitude }
    }
}

impl From<geo::Point<f64>> for LatLng {
    fn from(point: geo::Point<f64>) -> Self {
        Self {
            latitude: point.y(),
            longitude: point.x(),
        }
    }
}

impl From<&MapLocation> for LatLng {
    fn from(location: &MapLocation) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

/// Pixel size of a map container as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    /// A container that has not been laid out yet.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A numbered location marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Marker {
    /// 1-based position in the input order
    pub label: String,
    pub title: String,
    pub position: LatLng,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Marker {
    fn numbered(index: usize, location: &MapLocation) -> Self {
        Self {
            label: (index + 1).to_string(),
            title: location.display_title().to_string(),
            position: location.into(),
            description: location.description.clone(),
        }
    }
}

/// Route connecting the markers in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteLine {
    pub path: Vec<LatLng>,
    /// Encoded polyline (precision 5)
    pub encoded: String,
    pub stroke_color: String,
    pub stroke_weight: u8,
    pub stroke_opacity: f64,
}

impl RouteLine {
    fn new(path: Vec<LatLng>) -> Result<Self, MapError> {
        let encoded = polyline::encode_coordinates(path.iter().map(LatLng::coord), POLYLINE_PRECISION)
            .map_err(|e| MapError::Render(format!("Failed to encode route: {}", e)))?;

        Ok(Self {
            path,
            encoded,
            stroke_color: ROUTE_STROKE_COLOR.to_string(),
            stroke_weight: ROUTE_STROKE_WEIGHT,
            stroke_opacity: ROUTE_STROKE_OPACITY,
        })
    }
}

/// State of the interactive map after a render or focus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InteractiveMap {
    pub container: String,
    pub viewport: Viewport,
    pub markers: Vec<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteLine>,
    /// Whether the viewport should be fitted to include every marker
    pub fit_view: bool,
    /// Static rendering of the map, when the backend provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl InteractiveMap {
    /// Markers and route as a GeoJSON feature collection.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let mut features: Vec<geojson::Feature> = self
            .markers
            .iter()
            .map(|marker| {
                let mut properties = geojson::JsonObject::new();
                properties.insert("label".to_string(), marker.label.clone().into());
                properties.insert("title".to_string(), marker.title.clone().into());
                if let Some(description) = &marker.description {
                    properties.insert("description".to_string(), description.clone().into());
                }

                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(
                        &geo::Point::from(marker.position.coord()),
                    ))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        if let Some(route) = &self.route {
            let mut properties = geojson::JsonObject::new();
            properties.insert("stroke".to_string(), route.stroke_color.clone().into());
            properties.insert("stroke-width".to_string(), route.stroke_weight.into());
            properties.insert("stroke-opacity".to_string(), route.stroke_opacity.into());

            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(
                    &geo::LineString::from_iter(route.path.iter().map(LatLng::coord)),
                ))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Static, non-interactive stand-in shown when the map cannot be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlaceholderPanel {
    pub container: String,
    pub center: LatLng,
    pub title: String,
    pub label: String,
    pub background: String,
}

impl PlaceholderPanel {
    pub fn new(container: &str, center: LatLng) -> Self {
        Self {
            container: container.to_string(),
            center,
            title: PLACEHOLDER_TITLE.to_string(),
            label: format!("中心点: {:.4}, {:.4}", center.latitude, center.longitude),
            background: PLACEHOLDER_BACKGROUND.to_string(),
        }
    }
}

/// Result of a render request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MapScene {
    Interactive(InteractiveMap),
    Placeholder(PlaceholderPanel),
}

/// Arithmetic mean of the locations, or the default center if there are none.
pub fn centroid(locations: &[MapLocation]) -> LatLng {
    let points: MultiPoint<f64> = locations.iter().map(MapLocation::point).collect();
    points.centroid().map(LatLng::from).unwrap_or(DEFAULT_CENTER)
}

// ─── SDK Abstraction ─────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("AMAP_API_KEY is not configured")]
    MissingCredential,

    #[error("Map SDK failed to load: {0}")]
    LoadFailed(String),

    #[error("Map SDK is not available")]
    Unavailable,

    #[error("Map rendering failed: {0}")]
    Render(String),
}

/// A mapping SDK.
#[async_trait]
pub trait MapSdk: Send + Sync {
    /// Load the SDK. Called once per initialization attempt.
    async fn load(&self) -> Result<(), MapError>;

    /// Whether the SDK can be used right now.
    fn is_available(&self) -> bool;

    /// Create the map instance inside a container.
    fn create_map(&self, container: &str, viewport: Viewport)
        -> Result<Box<dyn MapHandle>, MapError>;
}

/// A live map instance created by a [`MapSdk`].
pub trait MapHandle: Send {
    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), MapError>;
    /// Remove every marker and route.
    fn clear_overlays(&mut self);
    fn add_marker(&mut self, marker: &Marker) -> Result<(), MapError>;
    fn draw_route(&mut self, route: &RouteLine) -> Result<(), MapError>;
    /// Fit the viewport to include every marker.
    fn fit_view(&mut self) -> Result<(), MapError>;
    fn resize(&mut self, size: Option<ContainerSize>);

    /// Static rendering of the current map, if the backend can produce one.
    fn image_url(&self) -> Option<String> {
        None
    }
}

// ─── Gateway ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

enum Phase {
    Uninitialized,
    Initializing {
        generation: u64,
        load: Shared<BoxFuture<'static, Readiness>>,
    },
    Ready,
    Degraded,
}

impl From<Readiness> for Phase {
    fn from(readiness: Readiness) -> Self {
        match readiness {
            Readiness::Ready => Phase::Ready,
            Readiness::Degraded => Phase::Degraded,
        }
    }
}

struct MapState {
    phase: Phase,
    generation: u64,
    retry_count: u32,
    map: Option<Box<dyn MapHandle>>,
    map_container: Option<String>,
    scene: Option<InteractiveMap>,
    containers: HashMap<String, ContainerSize>,
    unavailable_reported: bool,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            generation: 0,
            retry_count: 0,
            map: None,
            map_container: None,
            scene: None,
            containers: HashMap::new(),
            unavailable_reported: false,
        }
    }
}

struct GatewayInner {
    sdk: Arc<dyn MapSdk>,
    state: Mutex<MapState>,
    /// Serializes renders; tokio's mutex grants the lock in request order.
    lane: Mutex<()>,
    queued: AtomicUsize,
    resize_generation: AtomicU64,
}

/// Handle to the process-wide map gateway. Cheap to clone.
#[derive(Clone)]
pub struct MapGateway {
    inner: Arc<GatewayInner>,
}

impl MapGateway {
    pub fn new(sdk: Arc<dyn MapSdk>) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                sdk,
                state: Mutex::new(MapState::default()),
                lane: Mutex::new(()),
                queued: AtomicUsize::new(0),
                resize_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(StaticMapSdk::from_config(config)))
    }

    /// Resolved readiness, or `None` while uninitialized or loading.
    pub async fn readiness(&self) -> Option<Readiness> {
        match self.inner.state.lock().await.phase {
            Phase::Ready => Some(Readiness::Ready),
            Phase::Degraded => Some(Readiness::Degraded),
            Phase::Uninitialized | Phase::Initializing { .. } => None,
        }
    }

    /// Number of renders waiting for initialization to resolve.
    pub fn queued_renders(&self) -> usize {
        self.inner.queued.load(Ordering::SeqCst)
    }

    /// Load the SDK if needed. Concurrent callers share one in-flight load.
    pub async fn initialize(&self) -> Readiness {
        let (generation, load) = {
            let mut state = self.inner.state.lock().await;
            let existing = match &state.phase {
                Phase::Ready => return Readiness::Ready,
                Phase::Degraded => return Readiness::Degraded,
                Phase::Initializing { generation, load } => Some((*generation, load.clone())),
                Phase::Uninitialized => None,
            };

            match existing {
                Some(in_flight) => in_flight,
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let sdk = self.inner.sdk.clone();
                    let load = load_sdk(sdk).boxed().shared();
                    state.phase = Phase::Initializing {
                        generation,
                        load: load.clone(),
                    };
                    tracing::info!(generation, "Loading map SDK");
                    (generation, load)
                }
            }
        };

        let readiness = load.await;

        let mut state = self.inner.state.lock().await;
        if matches!(state.phase, Phase::Initializing { generation: g, .. } if g == generation) {
            state.phase = readiness.into();
            tracing::info!(generation, ?readiness, "Map SDK initialization resolved");
        }
        readiness
    }

    /// Render markers and a route for the locations into a container.
    ///
    /// Never fails: an unusable SDK yields a placeholder panel. The first
    /// placeholder caused by an unavailable SDK carries a warning.
    pub async fn render_route(&self, container: &str, locations: &[MapLocation]) -> Outcome<MapScene> {
        let queued = self.readiness().await.is_none();
        if queued {
            self.inner.queued.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(container, "Map not ready, queueing render");
        }

        let _lane = self.inner.lane.lock().await;
        if queued {
            self.inner.queued.fetch_sub(1, Ordering::SeqCst);
        }

        self.initialize().await;

        loop {
            let mut state = self.inner.state.lock().await;

            if self.inner.sdk.is_available() {
                return draw(&mut state, self.inner.sdk.as_ref(), container, locations);
            }

            if state.retry_count >= MAX_LOAD_RETRIES {
                tracing::error!(
                    container,
                    retries = state.retry_count,
                    "Map SDK unavailable after retries, rendering placeholder"
                );
                let warning = if state.unavailable_reported {
                    None
                } else {
                    state.unavailable_reported = true;
                    Some(Warning::new(
                        WarningKind::MapUnavailable,
                        "地图服务不可用，已显示静态地图",
                    ))
                };
                return Outcome {
                    value: MapScene::Placeholder(PlaceholderPanel::new(container, centroid(locations))),
                    warning,
                };
            }

            state.retry_count += 1;
            tracing::info!(
                attempt = state.retry_count,
                max = MAX_LOAD_RETRIES,
                "Map SDK unavailable, re-initializing"
            );
            state.phase = Phase::Uninitialized;
            drop(state);

            self.initialize().await;
        }
    }

    /// Recenter the existing map on one location at street-level zoom.
    ///
    /// Markers are left as they are. Returns `None` if there is no usable map.
    pub async fn focus_on_location(&self, location: &MapLocation) -> Option<InteractiveMap> {
        let _lane = self.inner.lane.lock().await;
        self.initialize().await;

        if !self.inner.sdk.is_available() {
            tracing::warn!(name = %location.name, "Map SDK not available, cannot focus");
            return None;
        }

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let Some(map) = state.map.as_mut() else {
            tracing::warn!(name = %location.name, "No map instance to focus");
            return None;
        };

        let viewport = Viewport {
            center: location.into(),
            zoom: FOCUS_ZOOM,
        };
        if let Err(e) = map.set_viewport(viewport) {
            tracing::warn!(name = %location.name, error = %e, "Failed to focus map");
            return None;
        }

        let scene = state.scene.as_mut()?;
        scene.viewport = viewport;
        scene.fit_view = false;
        scene.image_url = map.image_url();
        tracing::debug!(name = %location.name, "Focused map on location");
        Some(scene.clone())
    }

    /// Record a container's size. If it hosts the map and the size changed,
    /// the map is resized after a short debounce.
    ///
    /// Returns whether a resize was scheduled.
    pub async fn notify_container_resized(&self, container: &str, size: ContainerSize) -> bool {
        let schedule = {
            let mut state = self.inner.state.lock().await;
            let previous = state.containers.insert(container.to_string(), size);
            previous != Some(size)
                && state.map.is_some()
                && state.map_container.as_deref() == Some(container)
        };
        if !schedule {
            return false;
        }

        let generation = self.inner.resize_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let gateway = self.clone();
        let container = container.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(RESIZE_DEBOUNCE).await;
            if gateway.inner.resize_generation.load(Ordering::SeqCst) != generation {
                return;
            }

            let mut state = gateway.inner.state.lock().await;
            let size = state.containers.get(&container).copied();
            if let Some(map) = state.map.as_mut() {
                map.resize(size);
                tracing::debug!(container = %container, ?size, "Resized map");
            }
        });
        true
    }

    /// Last size reported for a container.
    pub async fn container_size(&self, container: &str) -> Option<ContainerSize> {
        self.inner.state.lock().await.containers.get(container).copied()
    }

    /// The current interactive map, if one has been drawn.
    pub async fn current_scene(&self) -> Option<InteractiveMap> {
        self.inner.state.lock().await.scene.clone()
    }

    /// Drop the map instance and return to the uninitialized state.
    pub async fn reset(&self) {
        let _lane = self.inner.lane.lock().await;
        // Cancel any pending debounced resize.
        self.inner.resize_generation.fetch_add(1, Ordering::SeqCst);
        *self.inner.state.lock().await = MapState::default();
        tracing::info!("Map gateway reset");
    }
}

async fn load_sdk(sdk: Arc<dyn MapSdk>) -> Readiness {
    match sdk.load().await {
        Ok(()) if sdk.is_available() => Readiness::Ready,
        Ok(()) => {
            tracing::warn!("Map SDK loaded but is not usable");
            Readiness::Degraded
        }
        Err(e) => {
            tracing::warn!(error = %e, "Map SDK failed to load");
            Readiness::Degraded
        }
    }
}

fn draw(state: &mut MapState, sdk: &dyn MapSdk, container: &str, locations: &[MapLocation]) -> Outcome<MapScene> {
    if locations.is_empty() {
        tracing::debug!(container, "No locations, rendering placeholder");
        return Outcome::ok(MapScene::Placeholder(PlaceholderPanel::new(container, DEFAULT_CENTER)));
    }

    let center = centroid(locations);
    // The counter tracks consecutive availability failures; any completed
    // draw attempt ends the streak.
    state.retry_count = 0;

    match draw_interactive(state, sdk, container, locations, center) {
        Ok(scene) => {
            tracing::info!(
                container = %scene.container,
                markers = scene.markers.len(),
                "Rendered map route"
            );
            state.scene = Some(scene.clone());
            Outcome::ok(MapScene::Interactive(scene))
        }
        Err(e) => {
            tracing::error!(container, error = %e, "Map rendering failed, rendering placeholder");
            Outcome::degraded(
                MapScene::Placeholder(PlaceholderPanel::new(container, center)),
                Warning::new(WarningKind::MapUnavailable, "地图渲染失败，已显示静态地图"),
            )
        }
    }
}

fn draw_interactive(
    state: &mut MapState,
    sdk: &dyn MapSdk,
    container: &str,
    locations: &[MapLocation],
    center: LatLng,
) -> Result<InteractiveMap, MapError> {
    let mut viewport = Viewport {
        center,
        zoom: DEFAULT_ZOOM,
    };

    match state.map.as_mut() {
        Some(map) => {
            if state.map_container.as_deref() != Some(container) {
                tracing::debug!(container, "Reusing the existing map instance");
            }
            map.clear_overlays();
            map.set_viewport(viewport)?;
        }
        None => {
            tracing::info!(container, "Creating map instance");
            state.map = Some(sdk.create_map(container, viewport)?);
            state.map_container = Some(container.to_string());
        }
    }
    let map = state.map.as_mut().ok_or(MapError::Unavailable)?;

    let markers: Vec<Marker> = locations
        .iter()
        .enumerate()
        .map(|(i, location)| Marker::numbered(i, location))
        .collect();
    for marker in &markers {
        map.add_marker(marker)?;
    }

    let mut route = None;
    let fit_view = locations.len() > 1;
    if fit_view {
        let line = RouteLine::new(locations.iter().map(LatLng::from).collect())?;
        map.draw_route(&line)?;
        map.fit_view()?;
        route = Some(line);
    } else {
        viewport.center = LatLng::from(&locations[0]);
        map.set_viewport(viewport)?;
    }

    Ok(InteractiveMap {
        container: state
            .map_container
            .clone()
            .unwrap_or_else(|| container.to_string()),
        viewport,
        markers,
        route,
        fit_view,
        image_url: map.image_url(),
    })
}

// ─── AMap Backend ────────────────────────────────────────────

/// What a browser needs to load the interactive AMap SDK.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapClientConfig {
    pub script_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_js_code: Option<String>,
}

impl MapClientConfig {
    /// `None` when no AMap key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let key = config.amap_api_key.as_ref()?;
        Some(Self {
            script_url: format!("{}&key={}", AMAP_SCRIPT_URL, urlencoding::encode(key)),
            security_js_code: config.amap_security_code.clone(),
        })
    }
}

/// Server-side AMap backend producing static map images.
///
/// Loading verifies the key against the AMap REST API.
pub struct StaticMapSdk {
    http: reqwest::Client,
    host: String,
    api_key: Option<String>,
    loaded: AtomicBool,
}

#[derive(Deserialize)]
struct AmapStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: String,
}

impl StaticMapSdk {
    pub fn new(host: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.amap_rest_host.clone(), config.amap_api_key.clone())
    }
}

#[async_trait]
impl MapSdk for StaticMapSdk {
    async fn load(&self) -> Result<(), MapError> {
        let key = self.api_key.as_deref().ok_or(MapError::MissingCredential)?;

        let url = format!("{}/v3/ip?key={}", self.host, urlencoding::encode(key));
        let response: AmapStatus = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MapError::LoadFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| MapError::LoadFailed(e.to_string()))?;

        if response.status != "1" {
            self.loaded.store(false, Ordering::SeqCst);
            return Err(MapError::LoadFailed(response.info));
        }

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() && self.loaded.load(Ordering::SeqCst)
    }

    fn create_map(&self, container: &str, viewport: Viewport) -> Result<Box<dyn MapHandle>, MapError> {
        let key = self.api_key.clone().ok_or(MapError::MissingCredential)?;
        tracing::debug!(container, "Creating static map");
        Ok(Box::new(StaticMap {
            host: self.host.clone(),
            api_key: key,
            viewport,
            markers: Vec::new(),
            route: Vec::new(),
            fit_view: false,
            size: STATIC_MAP_DEFAULT_SIZE,
        }))
    }
}

struct StaticMap {
    host: String,
    api_key: String,
    viewport: Viewport,
    markers: Vec<Marker>,
    route: Vec<LatLng>,
    fit_view: bool,
    size: ContainerSize,
}

fn lng_lat(p: &LatLng) -> String {
    format!("{:.6},{:.6}", p.longitude, p.latitude)
}

/// AMap marker labels are a single character: 1-9, then A-Z.
fn marker_label(index: usize) -> char {
    const LABELS: &[u8] = b"123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    LABELS.get(index).map(|b| *b as char).unwrap_or('0')
}

impl MapHandle for StaticMap {
    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), MapError> {
        self.viewport = viewport;
        self.fit_view = false;
        Ok(())
    }

    fn clear_overlays(&mut self) {
        self.markers.clear();
        self.route.clear();
    }

    fn add_marker(&mut self, marker: &Marker) -> Result<(), MapError> {
        self.markers.push(marker.clone());
        Ok(())
    }

    fn draw_route(&mut self, route: &RouteLine) -> Result<(), MapError> {
        self.route = route.path.clone();
        Ok(())
    }

    fn fit_view(&mut self) -> Result<(), MapError> {
        if self.markers.is_empty() {
            return Err(MapError::Render("no markers to fit".to_string()));
        }
        self.fit_view = true;
        Ok(())
    }

    fn resize(&mut self, size: Option<ContainerSize>) {
        if let Some(size) = size.filter(|s| !s.is_empty()) {
            self.size = ContainerSize {
                width: size.width.min(STATIC_MAP_MAX_EDGE),
                height: size.height.min(STATIC_MAP_MAX_EDGE),
            };
        }
    }

    fn image_url(&self) -> Option<String> {
        let mut url = format!(
            "{}/v3/staticmap?key={}&size={}*{}",
            self.host,
            urlencoding::encode(&self.api_key),
            self.size.width,
            self.size.height
        );

        // Without location and zoom AMap fits the image to the overlays.
        if !self.fit_view {
            url.push_str(&format!(
                "&location={}&zoom={}",
                lng_lat(&self.viewport.center),
                self.viewport.zoom
            ));
        }

        if !self.markers.is_empty() {
            let markers: Vec<String> = self
                .markers
                .iter()
                .enumerate()
                .map(|(i, m)| format!("mid,,{}:{}", marker_label(i), lng_lat(&m.position)))
                .collect();
            url.push_str(&format!("&markers={}", urlencoding::encode(&markers.join("|"))));
        }

        if self.route.len() > 1 {
            let path: Vec<String> = self.route.iter().map(lng_lat).collect();
            let paths = format!(
                "{},0x{},{},,:{}",
                ROUTE_STROKE_WEIGHT,
                ROUTE_STROKE_COLOR.trim_start_matches('#'),
                ROUTE_STROKE_OPACITY,
                path.join(";")
            );
            url.push_str(&format!("&paths={}", urlencoding::encode(&paths)));
        }

        Some(url)
    }
}
