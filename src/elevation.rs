//! Elevation providers: remote services that fill in the elevation of a
//! sequence of locations.

use std::collections::BTreeMap;

use log::debug;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use crate::config::ElevationConfig;
use crate::error::ProviderError;
use crate::geo::Location;

/// A source of elevation data.
///
/// Implementations set the elevation of every location in `locations`, in
/// input order. No timeout or retry policy is imposed by callers; providers
/// that talk to the network apply their own.
pub trait ElevationProvider {
    fn elevation_data(&self, locations: &mut [Location]) -> Result<(), ProviderError>;
}

/// Builds a provider from its configuration section.
pub type ProviderConstructor = fn(&ElevationConfig) -> Box<dyn ElevationProvider>;

/// Explicit name → constructor map, handed to whoever needs to pick a
/// provider by name.
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, ProviderConstructor>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// A registry with every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MapQuestProvider::NAME, MapQuestProvider::boxed);
        registry
    }

    pub fn register(&mut self, name: &'static str, constructor: ProviderConstructor) {
        self.providers.insert(name, constructor);
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn create(
        &self,
        name: &str,
        conf: &ElevationConfig,
    ) -> Result<Box<dyn ElevationProvider>, ProviderError> {
        self.providers
            .get(name)
            .map(|constructor| constructor(conf))
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// MapQuest open elevation API.
///
/// <http://open.mapquestapi.com/elevation/>
pub struct MapQuestProvider {
    key: Option<String>,
    base_url: String,
    timeout: std::time::Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestResponse {
    info: MapQuestInfo,
    #[serde(default)]
    elevation_profile: Vec<MapQuestHeight>,
}

#[derive(Debug, Deserialize)]
struct MapQuestInfo {
    statuscode: i64,
    #[serde(default)]
    messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestHeight {
    height: f64,
}

impl MapQuestProvider {
    pub const NAME: &'static str = "mapquest";
    pub const BASE_URL: &'static str = "http://open.mapquestapi.com/elevation/v1/profile";

    pub fn from_config(conf: &ElevationConfig) -> Self {
        Self {
            key: conf.key.clone(),
            base_url: conf
                .base_url
                .clone()
                .unwrap_or_else(|| Self::BASE_URL.to_string()),
            timeout: std::time::Duration::from_secs(conf.timeout_secs),
        }
    }

    fn boxed(conf: &ElevationConfig) -> Box<dyn ElevationProvider> {
        Box::new(Self::from_config(conf))
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingCredential("key"))
    }

    /// Flattens locations into `[lat, lon, lat, lon, ...]`.
    fn request_body(locations: &[Location]) -> JsonValue {
        let coords: Vec<f64> = locations
            .iter()
            .flat_map(|l| [l.latitude(), l.longitude()])
            .collect();
        json!({ "latLngCollection": coords })
    }

    fn apply_response(
        locations: &mut [Location],
        response: MapQuestResponse,
    ) -> Result<(), ProviderError> {
        if response.info.statuscode != 0 {
            return Err(ProviderError::Upstream {
                status: response.info.statuscode,
                message: response.info.messages.join(" "),
            });
        }
        if response.elevation_profile.len() < locations.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "{} heights for {} locations",
                response.elevation_profile.len(),
                locations.len()
            )));
        }

        for (location, height) in locations.iter_mut().zip(&response.elevation_profile) {
            location.set_elevation(Some(height.height));
        }
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn fetch(&self, key: &str, body: JsonValue) -> Result<MapQuestResponse, ProviderError> {
        let response = ureq::post(&self.base_url)
            .query("key", key)
            .query("format", "json")
            .set("Content-Type", "application/json")
            .timeout(self.timeout)
            .send_json(body)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        response
            .into_json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    #[cfg(target_arch = "wasm32")]
    fn fetch(&self, _key: &str, _body: JsonValue) -> Result<MapQuestResponse, ProviderError> {
        Err(ProviderError::Transport(
            "HTTP requests are not available on this target".to_string(),
        ))
    }
}

impl ElevationProvider for MapQuestProvider {
    fn elevation_data(&self, locations: &mut [Location]) -> Result<(), ProviderError> {
        let key = self.key()?;
        if locations.is_empty() {
            return Ok(());
        }

        debug!(
            "requesting {} elevations from {}",
            locations.len(),
            self.base_url
        );
        let response = self.fetch(key, Self::request_body(locations))?;
        Self::apply_response(locations, response)
    }
}
