use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufReader, Read},
    num::ParseIntError,
    path::Path,
};

use rayon::prelude::*;
use shared::{colors::route_color, geo::reproject_path};

use crate::models::{
    GeoPoint, Route, RouteBounds, RouteCollection, RouteDetails, RouteFeature, RouteNumber, Stop,
    StopCollection, StopFeature,
};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] io::Error),
    #[error("invalid dataset definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("stop `{stop}` has invalid route number `{value}`")]
    InvalidRouteNumber { stop: String, value: String },
    #[error("stop `{0}` has no coordinates")]
    MissingCoordinates(String),
}

/// Which routes are shown on the map. Stops follow the visibility of their route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VisibleRoutes {
    #[default]
    All,
    Only(BTreeSet<RouteNumber>),
}

impl VisibleRoutes {
    /// Parses a comma separated list such as `"1,40,94"`.
    ///
    /// A missing parameter means every route; an empty one means none.
    pub fn parse(raw: Option<&str>) -> Result<Self, ParseIntError> {
        let Some(raw) = raw else {
            return Ok(VisibleRoutes::All);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<RouteNumber>)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(VisibleRoutes::Only)
    }

    pub fn contains(&self, number: RouteNumber) -> bool {
        match self {
            VisibleRoutes::All => true,
            VisibleRoutes::Only(set) => set.contains(&number),
        }
    }
}

/// Static routes and stops loaded once at start-up and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TransitDataset {
    routes: Vec<Route>,
    stops: Vec<Stop>,
}

impl TransitDataset {
    pub fn new(routes: Vec<Route>, stops: Vec<Stop>) -> Self {
        Self { routes, stops }
    }

    pub fn from_files(
        routes_path: impl AsRef<Path>,
        stops_path: impl AsRef<Path>,
    ) -> Result<Self, DatasetError> {
        let routes = BufReader::new(File::open(routes_path)?);
        let stops = BufReader::new(File::open(stops_path)?);
        Self::from_readers(routes, stops)
    }

    pub fn from_readers(routes: impl Read, stops: impl Read) -> Result<Self, DatasetError> {
        let routes: RouteCollection = serde_json::from_reader(routes)?;
        let stops: StopCollection = serde_json::from_reader(stops)?;
        Self::from_collections(routes, stops)
    }

    pub fn from_collections(
        routes: RouteCollection,
        stops: StopCollection,
    ) -> Result<Self, DatasetError> {
        let routes: Vec<Route> = routes
            .features
            .into_par_iter()
            .map(route_from_feature)
            .collect();
        let stops = stops
            .features
            .into_iter()
            .map(stop_from_feature)
            .collect::<Result<Vec<_>, _>>()?;

        let dataset = Self::new(routes, stops);
        let known = dataset.route_numbers();
        for stop in &dataset.stops {
            if known.binary_search(&stop.route).is_err() {
                tracing::warn!("stop `{}` references unknown route {}", stop.name, stop.route);
            }
        }
        tracing::info!(
            "loaded {} routes ({} lines) and {} stops",
            dataset.routes.len(),
            known.len(),
            dataset.stops.len()
        );
        Ok(dataset)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Distinct route numbers in ascending order.
    pub fn route_numbers(&self) -> Vec<RouteNumber> {
        let numbers: BTreeSet<_> = self.routes.iter().map(|r| r.number).collect();
        numbers.into_iter().collect()
    }

    pub fn routes_visible<'a>(&'a self, visible: &'a VisibleRoutes) -> impl Iterator<Item = &'a Route> {
        self.routes.iter().filter(move |r| visible.contains(r.number))
    }

    pub fn stops_visible<'a>(&'a self, visible: &'a VisibleRoutes) -> impl Iterator<Item = &'a Stop> {
        self.stops.iter().filter(move |s| visible.contains(s.route))
    }

    pub fn route(&self, number: RouteNumber) -> Option<&Route> {
        self.routes.iter().find(|r| r.number == number)
    }

    pub fn stops_for_route(&self, number: RouteNumber) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(move |s| s.route == number)
    }

    pub fn route_details(&self, number: RouteNumber) -> Option<RouteDetails> {
        let route = self.route(number)?.clone();
        let stops = self.stops_for_route(number).cloned().collect();
        Some(RouteDetails { route, stops })
    }

    /// Case-insensitive substring match on stop names.
    pub fn search_stops<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Stop> {
        let needle = query.trim().to_lowercase();
        self.stops
            .iter()
            .filter(move |s| s.name.to_lowercase().contains(&needle))
    }

    pub fn stop_by_name(&self, name: &str) -> Option<&Stop> {
        self.stops.iter().find(|s| s.name == name)
    }

    pub fn bounds(&self) -> Option<RouteBounds> {
        RouteBounds::from_points(
            self.routes
                .iter()
                .flat_map(|r| r.paths.iter())
                .flat_map(|path| path.iter()),
        )
    }
}

fn route_from_feature(feature: RouteFeature) -> Route {
    let number = RouteNumber(feature.properties.route);
    Route {
        id: feature.properties.id,
        name: feature.properties.name,
        number,
        color: route_color(number).to_string(),
        paths: feature
            .geometry
            .coordinates
            .iter()
            .map(|line| reproject_path(line))
            .collect(),
    }
}

fn stop_from_feature(feature: StopFeature) -> Result<Stop, DatasetError> {
    let props = feature.properties;
    let route = props
        .route
        .parse::<RouteNumber>()
        .map_err(|_| DatasetError::InvalidRouteNumber {
            stop: props.name.clone(),
            value: props.route.clone(),
        })?;
    let (lng, lat) = match feature.geometry.coordinates.as_slice() {
        [lng, lat, ..] => (*lng, *lat),
        _ => return Err(DatasetError::MissingCoordinates(props.name)),
    };

    Ok(Stop {
        name: props.name,
        location: GeoPoint::new(lat, lng),
        route,
        schedule: [props.time1, props.time2, props.time3, props.time4],
    })
}
