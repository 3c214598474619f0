//! Address search and reverse geocoding against a Nominatim-compatible service.

use std::{
    num::NonZeroUsize,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use lru::LruCache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::format::format_coordinate;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::models::GeoPoint;

/// Queries shorter than this never reach the provider.
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NominatimConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Comma separated ISO country codes, empty for no filter.
    pub country_codes: String,
    pub user_agent: String,
    /// Number of cached search queries, 0 disables the cache.
    pub cache_size: usize,
    /// Minimum spacing between two provider requests. Nominatim's usage
    /// policy allows at most one request per second.
    pub min_interval_ms: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 10,
            country_codes: "us".to_string(),
            user_agent: "MontereyTransitExplorer/1.0".to_string(),
            cache_size: 256,
            min_interval_ms: 1100,
        }
    }
}

impl NominatimConfig {
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            cache_size: 0,
            min_interval_ms: 0,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("geocoding connection failed: {0}")]
    ConnectionFailed(String),
    #[error("geocoding request failed: HTTP {0}")]
    Status(u16),
    #[error("geocoding parse error: {0}")]
    Parse(String),
    #[error("geocoding request timed out")]
    Timeout,
}

impl From<reqwest::Error> for GeocodingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeocodingError::Timeout
        } else if err.is_decode() {
            GeocodingError::Parse(err.to_string())
        } else {
            GeocodingError::ConnectionFailed(err.to_string())
        }
    }
}

#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Candidate locations for a free-form address. Short queries yield no candidates.
    async fn search(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError>;

    /// Display name for a coordinate, `None` when the provider knows no name.
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<String>, GeocodingError>;
}

/// Reverse geocodes `(lat, lng)`, falling back to the formatted coordinate.
pub async fn reverse_or_fallback(provider: &dyn GeocodingProvider, lat: f64, lng: f64) -> GeoPoint {
    let address = match provider.reverse(lat, lng).await {
        Ok(Some(name)) => name,
        Ok(None) => format_coordinate(lat, lng),
        Err(err) => {
            tracing::warn!("reverse geocoding failed for ({lat}, {lng}): {err}");
            format_coordinate(lat, lng)
        }
    };
    GeoPoint::new(lat, lng).with_address(address)
}

#[derive(Debug)]
pub struct NominatimClient {
    client: Client,
    config: NominatimConfig,
    cache: Option<Mutex<LruCache<String, Vec<GeoPoint>>>>,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodingError::ConnectionFailed(e.to_string()))?;
        let cache = NonZeroUsize::new(config.cache_size).map(|cap| Mutex::new(LruCache::new(cap)));

        Ok(Self {
            client,
            config: config.clone(),
            cache,
            last_request: tokio::sync::Mutex::new(None),
        })
    }

    fn cached(&self, key: &str) -> Option<Vec<GeoPoint>> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().ok()?;
        cache.get(key).cloned()
    }

    /// Waits until `min_interval_ms` has passed since the previous request.
    /// The async lock queues concurrent callers so they go out one by one.
    async fn rate_limit(&self) {
        let interval = Duration::from_millis(self.config.min_interval_ms);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(?wait, "rate limiting geocoding request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn remember(&self, key: String, results: &[GeoPoint]) {
        if let Some(Ok(mut cache)) = self.cache.as_ref().map(Mutex::lock) {
            cache.put(key, results.to_vec());
        }
    }
}

#[async_trait]
impl GeocodingProvider for NominatimClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let key = query.to_lowercase();
        if let Some(hit) = self.cached(&key) {
            debug!("geocoding cache hit");
            return Ok(hit);
        }

        let mut params = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("limit", "5".to_string()),
        ];
        if !self.config.country_codes.is_empty() {
            params.push(("countrycodes", self.config.country_codes.clone()));
        }

        self.rate_limit().await;
        let response = self
            .client
            .get(format!("{}/search", self.config.base_url))
            .query(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodingError::Status(response.status().as_u16()));
        }

        let raw: Vec<NominatimPlace> = response.json().await?;
        let results = raw
            .into_iter()
            .map(NominatimPlace::into_point)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("geocoded {} candidates", results.len());

        self.remember(key, &results);
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<String>, GeocodingError> {
        let params = [
            ("lat", lat.to_string()),
            ("lon", lng.to_string()),
            ("format", "json".to_string()),
        ];

        self.rate_limit().await;
        let response = self
            .client
            .get(format!("{}/reverse", self.config.base_url))
            .query(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodingError::Status(response.status().as_u16()));
        }

        let place: NominatimReverse = response.json().await?;
        Ok(place.display_name)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimPlace {
    fn into_point(self) -> Result<GeoPoint, GeocodingError> {
        let lat = self
            .lat
            .parse()
            .map_err(|_| GeocodingError::Parse(format!("invalid latitude `{}`", self.lat)))?;
        let lng = self
            .lon
            .parse()
            .map_err(|_| GeocodingError::Parse(format!("invalid longitude `{}`", self.lon)))?;
        Ok(GeoPoint::new(lat, lng).with_address(self.display_name))
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
}
