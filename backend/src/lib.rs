pub mod config;
pub mod dataset;
pub mod directions;
pub mod error;
pub mod geocoding;
pub mod gpx_export;
pub mod models;
pub mod planner;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use shared::{
    format::{format_distance_in, DistanceUnits},
    geo::find_nearest_with_distance,
};
use tower_http::cors::{Any, CorsLayer};

use crate::dataset::{TransitDataset, VisibleRoutes};
use crate::error::AppError;
use crate::geocoding::{GeocodingProvider, reverse_or_fallback};
use crate::gpx_export::encode_planned_route_as_gpx;
use crate::models::{
    GeoPoint, NearestStop, PlanRequest, PlanResponse, Route, RouteBounds, RouteDetails,
    RouteNumber, Stop,
};
use crate::planner::{TripPlanner, summary};

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<TransitDataset>,
    pub geocoder: Arc<dyn GeocodingProvider>,
    pub planner: TripPlanner,
    pub units: DistanceUnits,
}

impl AppState {
    pub fn new(
        dataset: Arc<TransitDataset>,
        geocoder: Arc<dyn GeocodingProvider>,
        directions: Arc<dyn directions::DirectionsProvider>,
        units: DistanceUnits,
    ) -> Self {
        let planner = TripPlanner::new(dataset.clone(), geocoder.clone(), directions);
        Self {
            dataset,
            geocoder,
            planner,
            units,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/routes", get(list_routes))
        .route("/api/routes/:number", get(route_details))
        .route("/api/stops", get(list_stops))
        .route("/api/stops/nearest", get(nearest_stop))
        .route("/api/stops/:name", get(stop_details))
        .route("/api/bounds", get(bounds))
        .route("/api/geocode/search", get(geocode_search))
        .route("/api/geocode/reverse", get(geocode_reverse))
        .route("/api/plan", post(plan_handler))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct VisibilityParams {
    visible: Option<String>,
    q: Option<String>,
}

impl VisibilityParams {
    fn visible_routes(&self) -> Result<VisibleRoutes, AppError> {
        VisibleRoutes::parse(self.visible.as_deref())
            .map_err(|e| AppError::BadRequest(format!("invalid route list: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct PointParams {
    lat: f64,
    lng: f64,
}

impl PointParams {
    fn validated(&self) -> Result<GeoPoint, AppError> {
        let point = GeoPoint::new(self.lat, self.lng);
        if !point.is_valid() {
            return Err(AppError::BadRequest("invalid coordinates".to_string()));
        }
        Ok(point)
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

/// GET /api/routes - routes currently shown on the map
async fn list_routes(
    State(state): State<AppState>,
    Query(params): Query<VisibilityParams>,
) -> Result<Json<Vec<Route>>, AppError> {
    let visible = params.visible_routes()?;
    Ok(Json(state.dataset.routes_visible(&visible).cloned().collect()))
}

/// GET /api/routes/:number - a route with its stops and timetable
async fn route_details(
    State(state): State<AppState>,
    Path(number): Path<u32>,
) -> Result<Json<RouteDetails>, AppError> {
    let number = RouteNumber(number);
    state
        .dataset
        .route_details(number)
        .map(Json)
        .ok_or(AppError::UnknownRoute(number))
}

/// GET /api/stops - stops of visible routes, optionally filtered by name
async fn list_stops(
    State(state): State<AppState>,
    Query(params): Query<VisibilityParams>,
) -> Result<Json<Vec<Stop>>, AppError> {
    let visible = params.visible_routes()?;
    let stops = match params.q.as_deref() {
        Some(query) => state
            .dataset
            .search_stops(query)
            .filter(|stop| visible.contains(stop.route))
            .cloned()
            .collect(),
        None => state.dataset.stops_visible(&visible).cloned().collect(),
    };
    Ok(Json(stops))
}

/// GET /api/stops/:name - a single stop for the stop drawer
async fn stop_details(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Stop>, AppError> {
    state
        .dataset
        .stop_by_name(&name)
        .cloned()
        .map(Json)
        .ok_or(AppError::UnknownStop(name))
}

async fn nearest_stop(
    State(state): State<AppState>,
    Query(params): Query<PointParams>,
) -> Result<Json<NearestStop>, AppError> {
    let point = params.validated()?;
    let (stop, distance_km) =
        find_nearest_with_distance(&point, state.dataset.stops()).ok_or(AppError::NoStops)?;
    Ok(Json(NearestStop {
        stop: stop.clone(),
        distance_km,
        distance_label: format_distance_in(distance_km * 1_000.0, state.units),
    }))
}

async fn bounds(State(state): State<AppState>) -> Result<Json<RouteBounds>, AppError> {
    state.dataset.bounds().map(Json).ok_or(AppError::NoRoutes)
}

async fn geocode_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<GeoPoint>>, AppError> {
    Ok(Json(state.geocoder.search(&params.q).await?))
}

async fn geocode_reverse(
    State(state): State<AppState>,
    Query(params): Query<PointParams>,
) -> Result<Json<GeoPoint>, AppError> {
    let point = params.validated()?;
    Ok(Json(
        reverse_or_fallback(state.geocoder.as_ref(), point.lat, point.lng).await,
    ))
}

/// POST /api/plan - road route between two points plus the nearest stops
async fn plan_handler(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let route = state.planner.plan_request(req).await?;
    let summary = summary(&route, state.units);
    tracing::info!("{summary}");

    let bounds = RouteBounds::from_points(&route.road_geometry.coordinates).unwrap_or(RouteBounds {
        min_lat: route.origin.lat.min(route.destination.lat),
        max_lat: route.origin.lat.max(route.destination.lat),
        min_lon: route.origin.lng.min(route.destination.lng),
        max_lon: route.origin.lng.max(route.destination.lng),
    });
    let gpx_base64 = encode_planned_route_as_gpx(&route)?;

    Ok(Json(PlanResponse {
        route,
        summary,
        bounds,
        gpx_base64,
    }))
}
