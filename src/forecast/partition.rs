use chrono::Datelike;

use crate::forecast::engine::{ForecastPoint, ForecastSeries};
use crate::forecast::season::SeasonMonths;

/// A forecast split by calendar month: every point lands in exactly one side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonalPartition {
    pub in_season: Vec<ForecastPoint>,
    pub out_of_season: Vec<ForecastPoint>,
}

/// Splits `forecast` by whether each point's month is one of `season`,
/// preserving date order on both sides.
pub fn partition(forecast: &ForecastSeries, season: &SeasonMonths) -> SeasonalPartition {
    let (in_season, out_of_season) = forecast
        .points()
        .iter()
        .partition(|p| season.contains(p.date.month()));

    SeasonalPartition {
        in_season,
        out_of_season,
    }
}
