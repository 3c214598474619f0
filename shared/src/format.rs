//! Human readable distance, duration and coordinate labels.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const METERS_PER_MILE: f64 = 1_609.344;
const FEET_PER_METER: f64 = 3.28084;

/// Display convention for distances. One convention is used for every label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnits {
    /// Feet below a tenth of a mile, miles above.
    #[default]
    Imperial,
    /// Meters below a kilometer, kilometers above.
    Metric,
}

impl FromStr for DistanceUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imperial" => Ok(DistanceUnits::Imperial),
            "metric" => Ok(DistanceUnits::Metric),
            other => Err(format!("unknown distance units `{other}`")),
        }
    }
}

impl fmt::Display for DistanceUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnits::Imperial => f.write_str("imperial"),
            DistanceUnits::Metric => f.write_str("metric"),
        }
    }
}

pub fn format_distance(meters: f64) -> String {
    format_distance_in(meters, DistanceUnits::Imperial)
}

pub fn format_distance_in(meters: f64, units: DistanceUnits) -> String {
    match units {
        DistanceUnits::Imperial => {
            let miles = meters / METERS_PER_MILE;
            if miles < 0.1 {
                format!("{} ft", (meters * FEET_PER_METER).round() as i64)
            } else {
                format!("{miles:.1} mi")
            }
        }
        DistanceUnits::Metric => {
            if meters < 1_000.0 {
                format!("{} m", meters.round() as i64)
            } else {
                format!("{:.1} km", meters / 1_000.0)
            }
        }
    }
}

/// Seconds are rounded to whole minutes once, before the hour split.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round() as i64;
    if minutes < 60 {
        return format!("{minutes} min");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

pub fn format_coordinate(lat: f64, lng: f64) -> String {
    format!("{lat:.4}, {lng:.4}")
}
