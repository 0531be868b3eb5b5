//! Trait and types for turning free-text locations into coordinates.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl Coordinate {
    /// OpenStreetMap link with a marker on this coordinate at zoom level 10.
    pub fn map_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={lat:.5}&mlon={lon:.5}#map=10/{lat:.5}/{lon:.5}",
            lat = self.latitude,
            lon = self.longitude
        )
    }
}

/// A geocoding match.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coordinate: Coordinate,
    /// Full address as reported by the geocoder.
    pub display_name: String,
}

/// Geocoder failures, split by whether a retry can help.
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// Timeouts, connection failures, HTTP 429 and 5xx.
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
    /// Anything a retry will not fix.
    #[error("geocoding request failed: {0}")]
    Failed(String),
}

/// Abstraction over a geocoding provider (e.g., Nominatim).
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns the best match for `query`, or `None` when nothing matches.
    async fn geocode(&self, query: &str) -> Result<Option<Place>, GeocodeError>;
}
