//! Geometry helpers: Web-Mercator reprojection, great-circle distance and
//! nearest-stop lookup.

use crate::{GeoPoint, Stop};

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Half the equatorial circumference of the EPSG:3857 sphere, in meters.
pub const MERCATOR_HALF_CIRCUMFERENCE: f64 = 20_037_508.34;

/// Converts a spherical Web-Mercator coordinate (meters) into `(lon, lat)` degrees.
pub fn reproject(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_HALF_CIRCUMFERENCE) * 180.0;
    let lat = (y / MERCATOR_HALF_CIRCUMFERENCE) * 180.0;
    let lat = (180.0 / std::f64::consts::PI)
        * (2.0 * (lat * std::f64::consts::PI / 180.0).exp().atan() - std::f64::consts::PI / 2.0);
    (lon, lat)
}

/// Reprojects a polyline into `[lon, lat]` pairs. Extra ordinates (e.g. `z`) are dropped.
pub fn reproject_path(path: &[Vec<f64>]) -> Vec<[f64; 2]> {
    path.iter()
        .filter(|coord| coord.len() >= 2)
        .map(|coord| {
            let (lon, lat) = reproject(coord[0], coord[1]);
            [lon, lat]
        })
        .collect()
}

pub fn haversine_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();

    let a = sin_dlat * sin_dlat
        + lat1.to_radians().cos() * lat2.to_radians().cos() * sin_dlng * sin_dlng;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn distance_to_stop_km(point: &GeoPoint, stop: &Stop) -> f64 {
    haversine_distance_km(point.lat, point.lng, stop.location.lat, stop.location.lng)
}

/// Closest stop to `point`, `None` when `stops` is empty.
///
/// Linear scan; on an exact tie the stop that comes first in `stops` wins.
pub fn find_nearest<'a>(point: &GeoPoint, stops: &'a [Stop]) -> Option<&'a Stop> {
    find_nearest_with_distance(point, stops).map(|(stop, _)| stop)
}

/// Like [`find_nearest`], also returning the distance in kilometers.
pub fn find_nearest_with_distance<'a>(
    point: &GeoPoint,
    stops: &'a [Stop],
) -> Option<(&'a Stop, f64)> {
    let mut best: Option<(&'a Stop, f64)> = None;
    for stop in stops {
        let distance = distance_to_stop_km(point, stop);
        match best {
            Some((_, min)) if distance >= min => {}
            _ => best = Some((stop, distance)),
        }
    }
    best
}
