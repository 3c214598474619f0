pub mod colors;
pub mod format;
pub mod geo;

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            address: None,
        }
    }

    pub fn with_address(self, address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..self
        }
    }

    /// True when latitude is within ±90° and longitude within ±180°.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Address when known, otherwise the coordinate pair.
    pub fn label(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| format::format_coordinate(self.lat, self.lng))
    }
}

/// Canonical route identifier shared by routes and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteNumber(pub u32);

impl FromStr for RouteNumber {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RouteNumber)
    }
}

impl fmt::Display for RouteNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub location: GeoPoint,
    pub route: RouteNumber,
    /// Up to four departure times as printed in the timetable.
    pub schedule: [Option<String>; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: u32,
    pub name: String,
    pub number: RouteNumber,
    pub color: String,
    /// Disjoint polylines as `[lon, lat]` pairs.
    pub paths: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    #[default]
    Driving,
}

impl TravelMode {
    pub fn profile(self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadGeometry {
    /// `[lon, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub road_geometry: RoadGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_origin_stop: Option<Stop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_destination_stop: Option<Stop>,
    #[serde(default)]
    pub mode: TravelMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RouteBounds {
    /// Bounding box of `[lon, lat]` pairs, `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 2]>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, &[lon, lat]| {
            Some(match bounds {
                None => RouteBounds {
                    min_lat: lat,
                    max_lat: lat,
                    min_lon: lon,
                    max_lon: lon,
                },
                Some(b) => RouteBounds {
                    min_lat: b.min_lat.min(lat),
                    max_lat: b.max_lat.max(lat),
                    min_lon: b.min_lon.min(lon),
                    max_lon: b.max_lon.max(lon),
                },
            })
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDetails {
    pub route: Route,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestStop {
    pub stop: Stop,
    pub distance_km: f64,
    pub distance_label: String,
}

/// Trip endpoint: either resolved coordinates or free text to geocode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Waypoint {
    Point(GeoPoint),
    Query { query: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub origin: Waypoint,
    pub destination: Waypoint,
    #[serde(default)]
    pub mode: TravelMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub route: PlannedRoute,
    pub summary: String,
    pub bounds: RouteBounds,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
