//! Wire shapes of the static GeoJSON datasets, as published by the transit agency.

use serde::{Deserialize, Serialize};

pub use shared::{
    GeoPoint, NearestStop, PlanRequest, PlanResponse, PlannedRoute, RoadGeometry, Route,
    RouteBounds, RouteDetails, RouteNumber, Stop, TravelMode, Waypoint,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteCollection {
    #[serde(default)]
    pub name: Option<String>,
    pub features: Vec<RouteFeature>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteFeature {
    pub properties: RouteProperties,
    pub geometry: MultiLineString,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteProperties {
    pub id: u32,
    pub name: String,
    #[serde(rename = "Route")]
    pub route: u32,
}

/// EPSG:3857 polylines; each vertex is `[x, y]` with optional extra ordinates.
#[derive(Debug, Serialize, Deserialize)]
pub struct MultiLineString {
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopCollection {
    #[serde(default)]
    pub name: Option<String>,
    pub features: Vec<StopFeature>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopFeature {
    pub properties: StopProperties,
    pub geometry: PointGeometry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopProperties {
    #[serde(rename = "Name")]
    pub name: String,
    pub time1: Option<String>,
    pub time2: Option<String>,
    pub time3: Option<String>,
    pub time4: Option<String>,
    /// Route number as text; parsed into [`RouteNumber`] at load time.
    pub route: String,
}

/// `[lon, lat]` or `[lon, lat, z]`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointGeometry {
    pub coordinates: Vec<f64>,
}
