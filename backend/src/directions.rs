//! Road and footpath geometry from an OSRM-compatible directions service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::{GeoPoint, RoadGeometry, TravelMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsrmConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            timeout_secs: 10,
            user_agent: "MontereyTransitExplorer/1.0".to_string(),
        }
    }
}

impl OsrmConfig {
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("directions connection failed: {0}")]
    ConnectionFailed(String),
    #[error("directions request failed: HTTP {0}")]
    Status(u16),
    #[error("directions parse error: {0}")]
    Parse(String),
    #[error("directions request timed out")]
    Timeout,
}

impl From<reqwest::Error> for DirectionsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DirectionsError::Timeout
        } else if err.is_decode() {
            DirectionsError::Parse(err.to_string())
        } else {
            DirectionsError::ConnectionFailed(err.to_string())
        }
    }
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Geometry between two points, `None` when the provider finds no route.
    async fn route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        mode: TravelMode,
    ) -> Result<Option<RoadGeometry>, DirectionsError>;
}

#[derive(Debug)]
pub struct OsrmClient {
    client: Client,
    config: OsrmConfig,
}

impl OsrmClient {
    pub fn new(config: &OsrmConfig) -> Result<Self, DirectionsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DirectionsError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn route_url(&self, origin: &GeoPoint, destination: &GeoPoint, mode: TravelMode) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.config.base_url,
            mode.profile(),
            origin.lng,
            origin.lat,
            destination.lng,
            destination.lat
        )
    }
}

#[async_trait]
impl DirectionsProvider for OsrmClient {
    #[instrument(skip(self))]
    async fn route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        mode: TravelMode,
    ) -> Result<Option<RoadGeometry>, DirectionsError> {
        let response = self
            .client
            .get(self.route_url(origin, destination, mode))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(DirectionsError::Status(status.as_u16()));
        }

        // OSRM reports NoRoute and NoSegment as 400 with a JSON body.
        let body: OsrmResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(DirectionsError::Status(status.as_u16())),
            Err(err) => return Err(err.into()),
        };
        if body.code != "Ok" {
            tracing::warn!("directions provider answered code {}", body.code);
            return Ok(None);
        }
        let Some(route) = body.routes.into_iter().next() else {
            tracing::warn!("directions provider returned no routes");
            return Ok(None);
        };
        debug!(
            "route with {} vertices, {:.0} m, {:.0} s",
            route.geometry.coordinates.len(),
            route.distance,
            route.duration
        );

        Ok(Some(RoadGeometry {
            coordinates: route.geometry.coordinates,
            distance_meters: route.distance,
            duration_seconds: route.duration,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_url_is_lng_lat_ordered() {
        let client = OsrmClient::new(&OsrmConfig::for_testing("http://osrm.test")).unwrap();
        let url = client.route_url(
            &GeoPoint::new(36.6, -121.8),
            &GeoPoint::new(36.62, -121.79),
            TravelMode::Walking,
        );
        assert_eq!(url, "http://osrm.test/route/v1/walking/-121.8,36.6;-121.79,36.62");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"code": "Ok", "routes": [{"geometry": {"type": "LineString",
            "coordinates": [[-121.8, 36.6], [-121.79, 36.62]]}, "distance": 2400.5, "duration": 310.2}]}"#;
        let body: OsrmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.code, "Ok");
        assert_eq!(body.routes[0].geometry.coordinates.len(), 2);
        assert_eq!(body.routes[0].distance, 2400.5);
    }

    #[test]
    fn test_no_route_response_parsing() {
        let body: OsrmResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap();
        assert_eq!(body.code, "NoRoute");
        assert!(body.routes.is_empty());
    }
}
