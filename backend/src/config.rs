use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use shared::format::DistanceUnits;

use crate::{directions::OsrmConfig, geocoding::NominatimConfig};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Transit explorer API: routes, stops and trip planning")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Route dataset (GeoJSON MultiLineStrings in EPSG:3857)
    #[arg(long, env = "ROUTES_GEOJSON", default_value = "backend/data/routes.geojson")]
    pub routes: PathBuf,

    /// Stop dataset (GeoJSON Points in WGS84)
    #[arg(long, env = "STOPS_GEOJSON", default_value = "backend/data/stops.geojson")]
    pub stops: PathBuf,

    #[arg(long, env = "NOMINATIM_URL", default_value = "https://nominatim.openstreetmap.org")]
    pub nominatim_url: String,

    #[arg(long, env = "OSRM_URL", default_value = "https://router.project-osrm.org")]
    pub osrm_url: String,

    /// Country filter for address search, empty to search worldwide
    #[arg(long, env = "GEOCODE_COUNTRY_CODES", default_value = "us")]
    pub country_codes: String,

    #[arg(long, env = "PROVIDER_USER_AGENT", default_value = "MontereyTransitExplorer/1.0")]
    pub user_agent: String,

    /// Timeout for each geocoding or directions request
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Cached address searches, 0 disables caching
    #[arg(long, env = "GEOCODE_CACHE_SIZE", default_value_t = 256)]
    pub geocode_cache: usize,

    /// Minimum milliseconds between two geocoding requests
    #[arg(long, env = "GEOCODE_MIN_INTERVAL_MS", default_value_t = 1100)]
    pub geocode_interval_ms: u64,

    /// Distance labels: imperial (ft/mi) or metric (m/km)
    #[arg(long, env = "DISTANCE_UNITS", default_value_t = DistanceUnits::Imperial)]
    pub units: DistanceUnits,
}

impl Config {
    pub fn nominatim(&self) -> NominatimConfig {
        NominatimConfig {
            base_url: self.nominatim_url.trim_end_matches('/').to_string(),
            timeout_secs: self.timeout_secs,
            country_codes: self.country_codes.clone(),
            user_agent: self.user_agent.clone(),
            cache_size: self.geocode_cache,
            min_interval_ms: self.geocode_interval_ms,
        }
    }

    pub fn osrm(&self) -> OsrmConfig {
        OsrmConfig {
            base_url: self.osrm_url.trim_end_matches('/').to_string(),
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone(),
        }
    }
}
