// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Place-name resolution.
//!
//! Names are resolved through the AMap place-search REST API when a key is
//! configured. Without a backend, or when it fails, a small built-in table of
//! well-known places is used, and anything else resolves to a single
//! synthetic candidate at the default center.

use crate::models::MapLocation;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Default center (Beijing) used for unresolvable names.
pub const DEFAULT_LATITUDE: f64 = 39.9042;
pub const DEFAULT_LONGITUDE: f64 = 116.4074;

const PAGE_SIZE: u32 = 10;

/// Cities the place search restricts itself to when searched by name.
const SAMPLE_CITIES: &[&str] = &["北京", "上海", "杭州"];

/// Built-in places for offline use, grouped by city.
const SAMPLE_PLACES: &[(&str, &[(&str, f64, f64)])] = &[
    (
        "北京",
        &[
            ("天安门广场", 39.9087, 116.3975),
            ("故宫博物院", 39.9162, 116.3972),
            ("颐和园", 39.9999, 116.2755),
            ("长城", 40.4341, 116.5720),
            ("北京动物园", 39.9391, 116.3424),
            ("慕田峪长城", 40.4341, 116.5720),
            ("798艺术区", 39.9896, 116.4895),
        ],
    ),
    (
        "上海",
        &[
            ("外滩", 31.2363, 121.4903),
            ("东方明珠", 31.2396, 121.4997),
            ("豫园", 31.2274, 121.4922),
            ("迪士尼乐园", 31.1439, 121.6579),
        ],
    ),
    (
        "杭州",
        &[
            ("西湖", 30.2429, 120.1447),
            ("灵隐寺", 30.2442, 120.0944),
            ("千岛湖", 29.8575, 118.9386),
            ("宋城", 30.1762, 120.1160),
        ],
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Place search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Place search returned status {status}: {info}")]
    Api { status: String, info: String },
}

/// A place-search backend.
#[async_trait]
pub trait GeocodeBackend: Send + Sync {
    /// Search for places matching a keyword. An empty result is not an error.
    async fn search(&self, keyword: &str) -> Result<Vec<MapLocation>, GeocodeError>;
}

/// AMap REST place search (`/v3/place/text`).
pub struct AmapPlaceSearch {
    http: reqwest::Client,
    host: String,
    api_key: String,
}

#[derive(Deserialize)]
struct PlaceSearchResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Deserialize)]
struct Poi {
    #[serde(default)]
    name: String,
    /// "lng,lat"
    #[serde(default)]
    location: String,
    /// A string, or `[]` when AMap has no address
    #[serde(default)]
    address: Value,
}

impl AmapPlaceSearch {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl GeocodeBackend for AmapPlaceSearch {
    async fn search(&self, keyword: &str) -> Result<Vec<MapLocation>, GeocodeError> {
        let mut url = format!(
            "{}/v3/place/text?keywords={}&offset={}&page=1&extensions=base&key={}",
            self.host,
            urlencoding::encode(keyword),
            PAGE_SIZE,
            urlencoding::encode(&self.api_key)
        );
        if SAMPLE_CITIES.contains(&keyword) {
            url.push_str(&format!("&city={}", urlencoding::encode(keyword)));
        }

        let response: PlaceSearchResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "1" {
            return Err(GeocodeError::Api {
                status: response.status,
                info: response.info,
            });
        }

        Ok(response.pois.into_iter().filter_map(Poi::into_location).collect())
    }
}

impl Poi {
    fn into_location(self) -> Option<MapLocation> {
        let (lng, lat) = self.location.split_once(',')?;
        let longitude = lng.trim().parse().ok()?;
        let latitude = lat.trim().parse().ok()?;

        let mut location = MapLocation::new(self.name, latitude, longitude);
        location.address = self
            .address
            .as_str()
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        Some(location)
    }
}

/// Resolves place names to coordinates, caching the first result per name.
///
/// The cache is never evicted; the set of names seen in one process is small.
#[derive(Clone)]
pub struct LocationResolver {
    backend: Option<Arc<dyn GeocodeBackend>>,
    cache: Arc<DashMap<String, MapLocation>>,
}

impl LocationResolver {
    pub fn new(backend: Option<Arc<dyn GeocodeBackend>>) -> Self {
        Self {
            backend,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Resolver using only the built-in table.
    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        let backend = config.amap_api_key.as_ref().map(|key| {
            Arc::new(AmapPlaceSearch::new(config.amap_rest_host.clone(), key.clone()))
                as Arc<dyn GeocodeBackend>
        });
        Self::new(backend)
    }

    /// Search for candidate locations. Never fails; an empty name yields none.
    pub async fn search(&self, name: &str) -> Vec<MapLocation> {
        self.search_inner(name).await.0
    }

    /// Resolve a name to its first candidate, consulting the cache first.
    pub async fn locate(&self, name: &str) -> Option<MapLocation> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some(hit) = self.cache.get(name) {
            return Some(hit.clone());
        }

        let (candidates, cacheable) = self.search_inner(name).await;
        let first = candidates.into_iter().next()?;
        if cacheable {
            self.cache.insert(name.to_string(), first.clone());
        }
        Some(first)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Returns the candidates and whether they may be cached. A synthetic
    /// candidate produced because the backend failed is not cached, so a
    /// later lookup can still succeed.
    async fn search_inner(&self, name: &str) -> (Vec<MapLocation>, bool) {
        let name = name.trim();
        if name.is_empty() {
            return (Vec::new(), false);
        }

        let Some(backend) = &self.backend else {
            return (offline_candidates(name), true);
        };

        match backend.search(name).await {
            Ok(found) if !found.is_empty() => {
                tracing::debug!(name, count = found.len(), "Place search succeeded");
                (found, true)
            }
            Ok(_) => {
                tracing::warn!(name, "Place search returned no results, using fallback");
                (offline_candidates(name), true)
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "Place search failed, using fallback");
                let candidates = offline_candidates(name);
                let cacheable = !is_synthetic(&candidates, name);
                (candidates, cacheable)
            }
        }
    }
}

/// Candidates from the built-in table: a city name yields its places, a
/// known place yields itself, anything else one synthetic candidate.
pub fn offline_candidates(name: &str) -> Vec<MapLocation> {
    if let Some((_, places)) = SAMPLE_PLACES.iter().find(|(city, _)| *city == name) {
        return places
            .iter()
            .map(|(place, lat, lng)| MapLocation::new(*place, *lat, *lng))
            .collect();
    }

    let known = SAMPLE_PLACES
        .iter()
        .flat_map(|(_, places)| places.iter())
        .find(|(place, _, _)| *place == name);
    if let Some((place, lat, lng)) = known {
        return vec![MapLocation::new(*place, *lat, *lng)];
    }

    vec![MapLocation::new(name, DEFAULT_LATITUDE, DEFAULT_LONGITUDE)]
}

fn is_synthetic(candidates: &[MapLocation], name: &str) -> bool {
    matches!(candidates, [only] if only.name == name
        && only.latitude == DEFAULT_LATITUDE
        && only.longitude == DEFAULT_LONGITUDE)
}
