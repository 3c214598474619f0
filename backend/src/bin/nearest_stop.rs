use std::path::PathBuf;

use backend::{dataset::TransitDataset, models::GeoPoint};
use clap::Parser;
use shared::{
    format::{format_distance_in, DistanceUnits},
    geo::find_nearest_with_distance,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(author, version, about = "Print the bus stop closest to a coordinate")]
struct Args {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    /// Route dataset (GeoJSON, EPSG:3857)
    #[arg(long, default_value = "backend/data/routes.geojson")]
    routes: PathBuf,

    /// Stop dataset (GeoJSON, WGS84)
    #[arg(long, default_value = "backend/data/stops.geojson")]
    stops: PathBuf,

    #[arg(long, default_value_t = DistanceUnits::Imperial)]
    units: DistanceUnits,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let dataset = TransitDataset::from_files(&args.routes, &args.stops)?;

    let point = GeoPoint::new(args.lat, args.lng);
    match find_nearest_with_distance(&point, dataset.stops()) {
        Some((stop, distance_km)) => {
            let route = dataset
                .route(stop.route)
                .map(|r| r.name.as_str())
                .unwrap_or("unknown line");
            println!(
                "{} (Route {}, {}) - {} away",
                stop.name,
                stop.route,
                route,
                format_distance_in(distance_km * 1_000.0, args.units)
            );
            let times: Vec<&str> = stop.schedule.iter().flatten().map(String::as_str).collect();
            if !times.is_empty() {
                println!("departures: {}", times.join(", "));
            }
        }
        None => {
            tracing::warn!("stop dataset {} is empty", args.stops.display());
            println!("no stops loaded");
        }
    }

    Ok(())
}
