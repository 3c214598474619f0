use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::Request,
};
use backend::{
    AppState, create_router,
    dataset::TransitDataset,
    directions::{DirectionsError, DirectionsProvider},
    geocoding::{GeocodingError, GeocodingProvider},
    models::{GeoPoint, PlanResponse, RoadGeometry, Route, RouteDetails, Stop, TravelMode},
};
use hyper::StatusCode;
use serde_json::{Value, json};
use shared::{NearestStop, format::DistanceUnits};
use tower::ServiceExt;

const ROUTES: &str = include_str!("../data/routes.geojson");
const STOPS: &str = include_str!("../data/stops.geojson");

struct FakeGeocoder {
    online: bool,
}

#[async_trait]
impl GeocodingProvider for FakeGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError> {
        if !self.online {
            return Err(GeocodingError::Status(503));
        }
        if query.trim().len() < 3 {
            return Ok(Vec::new());
        }
        Ok(vec![
            GeoPoint::new(36.6, -121.8).with_address(format!("{query}, Monterey, CA")),
        ])
    }

    async fn reverse(&self, _lat: f64, _lng: f64) -> Result<Option<String>, GeocodingError> {
        if self.online {
            Ok(Some("Del Rey Oaks, CA".to_string()))
        } else {
            Err(GeocodingError::Timeout)
        }
    }
}

struct FakeDirections(Option<RoadGeometry>);

#[async_trait]
impl DirectionsProvider for FakeDirections {
    async fn route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        _mode: TravelMode,
    ) -> Result<Option<RoadGeometry>, DirectionsError> {
        Ok(self.0.clone().map(|mut road| {
            road.coordinates = vec![[origin.lng, origin.lat], [destination.lng, destination.lat]];
            road
        }))
    }
}

fn road() -> RoadGeometry {
    RoadGeometry {
        coordinates: Vec::new(),
        distance_meters: 3_218.7,
        duration_seconds: 540.0,
    }
}

fn app_with(online: bool, directions: Option<RoadGeometry>) -> axum::Router {
    let dataset = TransitDataset::from_readers(ROUTES.as_bytes(), STOPS.as_bytes()).expect("dataset");
    let state = AppState::new(
        Arc::new(dataset),
        Arc::new(FakeGeocoder { online }),
        Arc::new(FakeDirections(directions)),
        DistanceUnits::Imperial,
    );
    create_router(state)
}

fn test_app() -> axum::Router {
    app_with(true, Some(road()))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, bytes.to_vec())
}

async fn post_plan(app: axum::Router, payload: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/plan")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn routes_endpoint_lists_every_route_by_default() {
    let (status, body) = get(test_app(), "/api/routes").await;
    assert_eq!(status, StatusCode::OK);
    let routes: Vec<Route> = serde_json::from_slice(&body).unwrap();
    assert_eq!(routes.len(), 3);
    let first = &routes[0];
    assert_eq!(first.color, "#95E1D3");
    let [lon, lat] = first.paths[0][0];
    assert!((lon - -121.8947).abs() < 1e-4, "lon = {lon}");
    assert!((lat - 36.5985).abs() < 1e-4, "lat = {lat}");
}

#[tokio::test]
async fn routes_endpoint_respects_visibility() {
    let (_, body) = get(test_app(), "/api/routes?visible=40,94").await;
    let routes: Vec<Route> = serde_json::from_slice(&body).unwrap();
    let numbers: Vec<u32> = routes.iter().map(|r| r.number.0).collect();
    assert_eq!(numbers, vec![40, 94]);

    let (_, body) = get(test_app(), "/api/routes?visible=").await;
    let routes: Vec<Route> = serde_json::from_slice(&body).unwrap();
    assert!(routes.is_empty());

    let (status, _) = get(test_app(), "/api/routes?visible=forty").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_details_include_stops() {
    let (status, body) = get(test_app(), "/api/routes/1").await;
    assert_eq!(status, StatusCode::OK);
    let details: RouteDetails = serde_json::from_slice(&body).unwrap();
    assert_eq!(details.route.name, "Monterey - Pacific Grove");
    assert_eq!(details.stops.len(), 4);
    assert!(details.stops.iter().all(|s| s.route == details.route.number));

    let (status, body) = get(test_app(), "/api/routes/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["message"], "route 7 not found");
}

#[tokio::test]
async fn stops_endpoint_filters_by_route_and_name() {
    let (_, body) = get(test_app(), "/api/stops?visible=94").await;
    let stops: Vec<Stop> = serde_json::from_slice(&body).unwrap();
    assert_eq!(stops.len(), 2);

    let (_, body) = get(test_app(), "/api/stops?q=transit").await;
    let stops: Vec<Stop> = serde_json::from_slice(&body).unwrap();
    let names: Vec<&str> = stops.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Monterey Transit Plaza", "Marina Transit Exchange"]);

    let (_, body) = get(test_app(), "/api/stops?q=transit&visible=1").await;
    let stops: Vec<Stop> = serde_json::from_slice(&body).unwrap();
    assert_eq!(stops.len(), 1);
}

#[tokio::test]
async fn stop_endpoint_looks_up_by_exact_name() {
    let (status, body) = get(test_app(), "/api/stops/Lighthouse%20%26%20Dickman").await;
    assert_eq!(status, StatusCode::OK);
    let stop: Stop = serde_json::from_slice(&body).unwrap();
    assert_eq!(stop.name, "Lighthouse & Dickman");

    let (status, body) = get(test_app(), "/api/stops/Nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["message"], "stop \"Nowhere\" not found");
}

#[tokio::test]
async fn nearest_stop_endpoint() {
    let (status, body) = get(test_app(), "/api/stops/nearest?lat=36.6&lng=-121.8").await;
    assert_eq!(status, StatusCode::OK);
    let nearest: NearestStop = serde_json::from_slice(&body).unwrap();
    assert_eq!(nearest.stop.name, "Monterey Regional Airport");
    assert!(nearest.distance_km < 0.2);
    assert_eq!(nearest.distance_label, "468 ft");

    let (status, _) = get(test_app(), "/api/stops/nearest?lat=120&lng=-121.8").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bounds_endpoint_covers_the_network() {
    let (status, body) = get(test_app(), "/api/bounds").await;
    assert_eq!(status, StatusCode::OK);
    let bounds: Value = serde_json::from_slice(&body).unwrap();
    assert!(bounds["min_lon"].as_f64().unwrap() < -121.92);
    assert!(bounds["max_lat"].as_f64().unwrap() > 36.68);
}

#[tokio::test]
async fn plan_attaches_the_nearest_origin_stop() {
    let payload = json!({
        "origin": {"lat": 36.6, "lng": -121.8},
        "destination": {"lat": 36.62, "lng": -121.79},
        "mode": "walking"
    });
    let (status, body) = post_plan(test_app(), payload).await;
    assert_eq!(status, StatusCode::OK);

    let response: PlanResponse = serde_json::from_slice(&body).unwrap();
    let origin_stop = response.route.nearest_origin_stop.as_ref().unwrap();
    assert_eq!(origin_stop.name, "Monterey Regional Airport");
    assert_eq!(response.route.mode, TravelMode::Walking);
    assert_eq!(response.route.road_geometry.coordinates.len(), 2);
    assert_eq!(
        response.summary,
        "Route found! 2.0 mi, ~9 min. Closest bus route: Route 94"
    );
    assert_eq!(response.bounds.min_lat, 36.6);
    assert_eq!(response.bounds.max_lat, 36.62);
    assert!(!response.gpx_base64.is_empty());
}

#[tokio::test]
async fn plan_geocodes_free_text_waypoints() {
    let payload = json!({
        "origin": {"query": "Cannery Row"},
        "destination": {"lat": 36.62, "lng": -121.79}
    });
    let (status, body) = post_plan(test_app(), payload).await;
    assert_eq!(status, StatusCode::OK);
    let response: PlanResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        response.route.origin.address.as_deref(),
        Some("Cannery Row, Monterey, CA")
    );
    assert_eq!(response.route.mode, TravelMode::Driving);
}

#[tokio::test]
async fn plan_without_directions_is_not_found() {
    let payload = json!({
        "origin": {"lat": 36.6, "lng": -121.8},
        "destination": {"lat": 36.62, "lng": -121.79}
    });
    let (status, body) = post_plan(app_with(true, None), payload).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error["message"],
        "unable to find a route between the selected locations"
    );
}

#[tokio::test]
async fn plan_rejects_out_of_range_coordinates() {
    let payload = json!({
        "origin": {"lat": 500, "lng": -121.8},
        "destination": {"lat": 36.62, "lng": -9999}
    });
    let (status, body) = post_plan(test_app(), payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["message"], "invalid coordinates (500, -121.8)");
}

#[tokio::test]
async fn plan_reports_geocoder_outage_as_bad_gateway() {
    let payload = json!({
        "origin": {"query": "Cannery Row"},
        "destination": {"lat": 36.62, "lng": -121.79}
    });
    let (status, _) = post_plan(app_with(false, Some(road())), payload).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn geocode_endpoints() {
    let (status, body) = get(test_app(), "/api/geocode/search?q=Alvarado").await;
    assert_eq!(status, StatusCode::OK);
    let hits: Vec<GeoPoint> = serde_json::from_slice(&body).unwrap();
    assert_eq!(hits.len(), 1);

    let (_, body) = get(test_app(), "/api/geocode/reverse?lat=36.6&lng=-121.8").await;
    let point: GeoPoint = serde_json::from_slice(&body).unwrap();
    assert_eq!(point.address.as_deref(), Some("Del Rey Oaks, CA"));
}

#[tokio::test]
async fn reverse_geocode_falls_back_to_coordinates() {
    let (status, body) = get(
        app_with(false, Some(road())),
        "/api/geocode/reverse?lat=36.6&lng=-121.8",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let point: GeoPoint = serde_json::from_slice(&body).unwrap();
    assert_eq!(point.address.as_deref(), Some("36.6000, -121.8000"));
}
