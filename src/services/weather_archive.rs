//! Trait and types for retrieving historical daily precipitation.

use anyhow::Result;
use chrono::NaiveDate;

use super::geocoder::Coordinate;

/// One day as reported by the archive, before cleaning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    pub date: NaiveDate,
    /// Daily precipitation sum in millimetres; `None` when the source has no value.
    pub precipitation_mm: Option<f64>,
}

/// Abstraction over a historical weather provider (e.g., Open-Meteo archive).
#[async_trait::async_trait]
pub trait WeatherArchive: Send + Sync {
    /// Returns daily precipitation for `coord` between `start` and `end`, both inclusive.
    async fn daily_precipitation(
        &self,
        coord: Coordinate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>>;
}
