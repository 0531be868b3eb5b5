use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::forecast::engine::ForecastPoint;
use crate::forecast::utility::mean_opt;
use crate::pipeline::RunOutput;

/// One row describing a finished forecasting run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    // history
    pub raw_days: usize,
    pub cleaned_days: usize,
    pub season_months: String,

    // forecast
    pub horizon_years: u32,
    pub horizon_days: usize,
    pub in_season_points: usize,
    pub out_of_season_points: usize,
    pub in_season_pct: f64,
    pub mean_forecast_mm: Option<f64>,
    pub in_season_mean_mm: Option<f64>,
    pub out_of_season_mean_mm: Option<f64>,
    pub negative_points: usize,
}

impl RunSummary {
    pub fn from_output(query: &str, output: &RunOutput) -> Self {
        let history = &output.history;
        let partition = &output.partition;

        RunSummary {
            timestamp: Utc::now(),
            query: query.to_string(),
            display_name: history.place.display_name.clone(),
            latitude: history.place.coordinate.latitude,
            longitude: history.place.coordinate.longitude,
            start_date: Some(history.start),
            end_date: Some(history.end),
            raw_days: history.raw_days,
            cleaned_days: history.history.len(),
            season_months: history.season_months.to_string(),
            horizon_years: output.years,
            horizon_days: output.forecast.len(),
            in_season_points: partition.in_season.len(),
            out_of_season_points: partition.out_of_season.len(),
            in_season_pct: Self::pct(partition.in_season.len(), output.forecast.len()),
            mean_forecast_mm: mean_opt(&output.forecast.values()),
            in_season_mean_mm: mean_opt(&values(&partition.in_season)),
            out_of_season_mean_mm: mean_opt(&values(&partition.out_of_season)),
            negative_points: output.forecast.negative_count(),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

fn values(points: &[ForecastPoint]) -> Vec<f64> {
    points.iter().map(|p| p.forecasted_mm).collect()
}
