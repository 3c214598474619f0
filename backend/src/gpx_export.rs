use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::RouteError;
use crate::models::{PlannedRoute, Stop};

/// Encodes a planned trip as base64 GPX: the road geometry as one track,
/// the boarding and alighting stops as named waypoints.
pub fn encode_planned_route_as_gpx(route: &PlannedRoute) -> Result<String, RouteError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("transit_explorer".into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(format!("{} → {}", route.origin.label(), route.destination.label())),
        type_: Some(route.mode.profile().into()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    for &[lon, lat] in &route.road_geometry.coordinates {
        segment.points.push(Waypoint::new(Point::new(lon, lat)));
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    for stop in [&route.nearest_origin_stop, &route.nearest_destination_stop]
        .into_iter()
        .flatten()
    {
        gpx.waypoints.push(stop_waypoint(stop));
    }

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn stop_waypoint(stop: &Stop) -> Waypoint {
    let mut waypoint = Waypoint::new(Point::new(stop.location.lng, stop.location.lat));
    waypoint.name = Some(stop.name.clone());
    waypoint.description = Some(format!("Route {}", stop.route));
    waypoint
}
