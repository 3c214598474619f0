use std::sync::Arc;

use shared::{
    format::{format_distance_in, format_duration, DistanceUnits},
    geo::find_nearest,
};
use thiserror::Error;

use crate::{
    dataset::TransitDataset,
    directions::{DirectionsError, DirectionsProvider},
    geocoding::{GeocodingError, GeocodingProvider},
    models::{GeoPoint, PlanRequest, PlannedRoute, TravelMode, Waypoint},
};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unable to find a route between the selected locations")]
    NoRoute,
    #[error("no location found for `{0}`")]
    AddressNotFound(String),
    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    #[error(transparent)]
    Directions(#[from] DirectionsError),
}

/// Builds trip plans from directions and the nearest stops to each end.
#[derive(Clone)]
pub struct TripPlanner {
    dataset: Arc<TransitDataset>,
    geocoder: Arc<dyn GeocodingProvider>,
    directions: Arc<dyn DirectionsProvider>,
}

impl TripPlanner {
    pub fn new(
        dataset: Arc<TransitDataset>,
        geocoder: Arc<dyn GeocodingProvider>,
        directions: Arc<dyn DirectionsProvider>,
    ) -> Self {
        Self {
            dataset,
            geocoder,
            directions,
        }
    }

    /// Free-text waypoints resolve to the provider's first candidate.
    pub async fn resolve(&self, waypoint: Waypoint) -> Result<GeoPoint, PlanError> {
        match waypoint {
            Waypoint::Point(point) if point.is_valid() => Ok(point),
            Waypoint::Point(point) => Err(PlanError::InvalidCoordinates {
                lat: point.lat,
                lng: point.lng,
            }),
            Waypoint::Query { query } => self
                .geocoder
                .search(&query)
                .await?
                .into_iter()
                .next()
                .ok_or(PlanError::AddressNotFound(query)),
        }
    }

    /// Resolves origin, then destination, then plans. No retries.
    pub async fn plan_request(&self, req: PlanRequest) -> Result<PlannedRoute, PlanError> {
        let origin = self.resolve(req.origin).await?;
        let destination = self.resolve(req.destination).await?;
        self.plan(origin, destination, req.mode).await
    }

    pub async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> Result<PlannedRoute, PlanError> {
        tracing::info!(
            "planning {} trip ({:.5},{:.5}) -> ({:.5},{:.5})",
            mode.profile(),
            origin.lat,
            origin.lng,
            destination.lat,
            destination.lng
        );

        let road_geometry = self
            .directions
            .route(&origin, &destination, mode)
            .await?
            .ok_or(PlanError::NoRoute)?;

        let stops = self.dataset.stops();
        let nearest_origin_stop = find_nearest(&origin, stops).cloned();
        let nearest_destination_stop = find_nearest(&destination, stops).cloned();

        Ok(PlannedRoute {
            origin,
            destination,
            road_geometry,
            nearest_origin_stop,
            nearest_destination_stop,
            mode,
        })
    }
}

/// One-line notice shown to the user once a trip is planned.
pub fn summary(route: &PlannedRoute, units: DistanceUnits) -> String {
    let route_info = match &route.nearest_origin_stop {
        Some(stop) => format!("Closest bus route: Route {}", stop.route),
        None => "No nearby bus stops found".to_string(),
    };
    format!(
        "Route found! {}, ~{}. {}",
        format_distance_in(route.road_geometry.distance_meters, units),
        format_duration(route.road_geometry.duration_seconds),
        route_info
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::{RoadGeometry, RouteNumber, Stop};

    struct FixedDirections(Option<RoadGeometry>);

    #[async_trait]
    impl DirectionsProvider for FixedDirections {
        async fn route(
            &self,
            _origin: &GeoPoint,
            _destination: &GeoPoint,
            _mode: TravelMode,
        ) -> Result<Option<RoadGeometry>, DirectionsError> {
            Ok(self.0.clone())
        }
    }

    struct FailingDirections;

    #[async_trait]
    impl DirectionsProvider for FailingDirections {
        async fn route(
            &self,
            _origin: &GeoPoint,
            _destination: &GeoPoint,
            _mode: TravelMode,
        ) -> Result<Option<RoadGeometry>, DirectionsError> {
            Err(DirectionsError::Timeout)
        }
    }

    struct Gazetteer;

    #[async_trait]
    impl GeocodingProvider for Gazetteer {
        async fn search(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError> {
            Ok(match query {
                "Fishermans Wharf" => vec![
                    GeoPoint::new(36.6036, -121.8916).with_address("Old Fisherman's Wharf"),
                    GeoPoint::new(36.6, -121.9).with_address("Wharf 2"),
                ],
                _ => Vec::new(),
            })
        }

        async fn reverse(&self, _lat: f64, _lng: f64) -> Result<Option<String>, GeocodingError> {
            Ok(None)
        }
    }

    fn stop(name: &str, route: u32, lat: f64, lng: f64) -> Stop {
        Stop {
            name: name.to_string(),
            location: GeoPoint::new(lat, lng),
            route: RouteNumber(route),
            schedule: Default::default(),
        }
    }

    fn road() -> RoadGeometry {
        RoadGeometry {
            coordinates: vec![[-121.8, 36.6], [-121.795, 36.61], [-121.79, 36.62]],
            distance_meters: 2_414.0,
            duration_seconds: 420.0,
        }
    }

    fn planner(stops: Vec<Stop>, directions: Arc<dyn DirectionsProvider>) -> TripPlanner {
        TripPlanner::new(
            Arc::new(TransitDataset::new(Vec::new(), stops)),
            Arc::new(Gazetteer),
            directions,
        )
    }

    #[tokio::test]
    async fn test_plan_attaches_nearest_stops() {
        let stops = vec![
            stop("Del Monte", 40, 36.64, -121.75),
            stop("Lighthouse", 1, 36.601, -121.801),
            stop("Cannery Row", 94, 36.619, -121.791),
        ];
        let planner = planner(stops, Arc::new(FixedDirections(Some(road()))));

        let planned = planner
            .plan(
                GeoPoint::new(36.6, -121.8),
                GeoPoint::new(36.62, -121.79),
                TravelMode::Walking,
            )
            .await
            .unwrap();

        assert_eq!(planned.nearest_origin_stop.unwrap().name, "Lighthouse");
        assert_eq!(planned.nearest_destination_stop.unwrap().name, "Cannery Row");
        assert_eq!(planned.mode, TravelMode::Walking);
        assert_eq!(planned.road_geometry, road());
    }

    #[tokio::test]
    async fn test_plan_without_stops_has_no_annotations() {
        let planner = planner(Vec::new(), Arc::new(FixedDirections(Some(road()))));
        let planned = planner
            .plan(
                GeoPoint::new(36.6, -121.8),
                GeoPoint::new(36.62, -121.79),
                TravelMode::Driving,
            )
            .await
            .unwrap();
        assert!(planned.nearest_origin_stop.is_none());
        assert!(planned.nearest_destination_stop.is_none());
        assert_eq!(
            summary(&planned, DistanceUnits::Imperial),
            "Route found! 1.5 mi, ~7 min. No nearby bus stops found"
        );
    }

    #[tokio::test]
    async fn test_missing_directions_is_no_route() {
        let planner = planner(Vec::new(), Arc::new(FixedDirections(None)));
        let err = planner
            .plan(
                GeoPoint::new(36.6, -121.8),
                GeoPoint::new(36.62, -121.79),
                TravelMode::Driving,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::NoRoute));
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let planner = planner(Vec::new(), Arc::new(FailingDirections));
        let err = planner
            .plan(
                GeoPoint::new(36.6, -121.8),
                GeoPoint::new(36.62, -121.79),
                TravelMode::Driving,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Directions(DirectionsError::Timeout)));
    }

    #[tokio::test]
    async fn test_query_waypoints_take_first_candidate() {
        let planner = planner(Vec::new(), Arc::new(FixedDirections(Some(road()))));
        let point = planner
            .resolve(Waypoint::Query {
                query: "Fishermans Wharf".into(),
            })
            .await
            .unwrap();
        assert_eq!(point.address.as_deref(), Some("Old Fisherman's Wharf"));

        let err = planner
            .resolve(Waypoint::Query {
                query: "Atlantis".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::AddressNotFound(ref q) if q == "Atlantis"));
    }

    #[tokio::test]
    async fn test_out_of_range_points_are_rejected() {
        let planner = planner(Vec::new(), Arc::new(FixedDirections(Some(road()))));
        let err = planner
            .plan_request(PlanRequest {
                origin: Waypoint::Point(GeoPoint::new(500.0, -121.8)),
                destination: Waypoint::Point(GeoPoint::new(36.62, -121.79)),
                mode: TravelMode::Driving,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidCoordinates { lat, .. } if lat == 500.0));
    }

    #[tokio::test]
    async fn test_plan_request_resolves_both_ends() {
        let stops = vec![stop("Wharf Stop", 1, 36.6035, -121.8915)];
        let planner = planner(stops, Arc::new(FixedDirections(Some(road()))));
        let planned = planner
            .plan_request(PlanRequest {
                origin: Waypoint::Query {
                    query: "Fishermans Wharf".into(),
                },
                destination: Waypoint::Point(GeoPoint::new(36.62, -121.79)),
                mode: TravelMode::Driving,
            })
            .await
            .unwrap();
        assert_eq!(planned.origin.lat, 36.6036);
        assert_eq!(planned.nearest_origin_stop.unwrap().name, "Wharf Stop");
    }

    #[test]
    fn test_summary_names_the_closest_route() {
        let planned = PlannedRoute {
            origin: GeoPoint::new(36.6, -121.8),
            destination: GeoPoint::new(36.62, -121.79),
            road_geometry: RoadGeometry {
                coordinates: Vec::new(),
                distance_meters: 5_400.0,
                duration_seconds: 75.0 * 60.0,
            },
            nearest_origin_stop: Some(stop("Lighthouse", 40, 36.601, -121.801)),
            nearest_destination_stop: None,
            mode: TravelMode::Walking,
        };
        assert_eq!(
            summary(&planned, DistanceUnits::Imperial),
            "Route found! 3.4 mi, ~1h 15m. Closest bus route: Route 40"
        );
        assert_eq!(
            summary(&planned, DistanceUnits::Metric),
            "Route found! 5.4 km, ~1h 15m. Closest bus route: Route 40"
        );
    }
}
