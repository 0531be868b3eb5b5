//! One forecasting run: resolve → fetch → detect season → forecast → partition.
//!
//! Every stage runs to completion before the next starts and the first error
//! ends the run; nothing is cached between runs.

use chrono::NaiveDate;
use tracing::info;

use crate::config::{ModelConfig, ResolverConfig};
use crate::error::{RainfallError, Result};
use crate::forecast::engine::{ForecastEngine, ForecastSeries, horizon_days};
use crate::forecast::partition::{SeasonalPartition, partition};
use crate::forecast::season::{SeasonMonths, detect_season_months};
use crate::history::{HistoricalSeries, fetch_history};
use crate::resolver::resolve;
use crate::services::geocoder::{Geocoder, Place};
use crate::services::weather_archive::WeatherArchive;

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub location: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub years: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub resolver: ResolverConfig,
    pub model: ModelConfig,
}

/// History side of a run, up to and including season detection.
#[derive(Debug, Clone)]
pub struct HistoryOutput {
    pub place: Place,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub raw_days: usize,
    pub history: HistoricalSeries,
    pub season_months: SeasonMonths,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub history: HistoryOutput,
    pub years: u32,
    pub forecast: ForecastSeries,
    pub partition: SeasonalPartition,
}

/// Resolves the location, fetches and cleans its history and detects the
/// season months.
#[tracing::instrument(skip_all, fields(location = %request.location, start = %request.start, end = %request.end))]
pub async fn run_history<G, A>(
    geocoder: &G,
    archive: &A,
    request: &RunRequest,
    config: &PipelineConfig,
) -> Result<HistoryOutput>
where
    G: Geocoder + ?Sized,
    A: WeatherArchive + ?Sized,
{
    if request.start > request.end {
        return Err(RainfallError::InvalidDateRange {
            start: request.start,
            end: request.end,
        });
    }

    let place = resolve(geocoder, &request.location, &config.resolver).await?;
    let fetched = fetch_history(archive, place.coordinate, request.start, request.end).await?;

    let season_months = detect_season_months(&fetched.series, config.model.season_month_count);
    info!(season_months = %season_months, "Season months detected");

    Ok(HistoryOutput {
        place,
        start: request.start,
        end: request.end,
        raw_days: fetched.raw_days,
        history: fetched.series,
        season_months,
    })
}

/// Runs the whole pipeline for `request`.
///
/// The horizon and model config are checked before any service is called.
/// Forecast dates start at `request.end`.
#[tracing::instrument(skip_all, fields(location = %request.location, years = request.years))]
pub async fn run<G, A>(
    geocoder: &G,
    archive: &A,
    request: &RunRequest,
    config: &PipelineConfig,
) -> Result<RunOutput>
where
    G: Geocoder + ?Sized,
    A: WeatherArchive + ?Sized,
{
    let days = horizon_days(request.years)?;
    let engine = ForecastEngine::new(config.model.clone())?;

    let history = run_history(geocoder, archive, request, config).await?;

    let forecast = engine.forecast(&history.history, days, request.end)?;
    let partition = partition(&forecast, &history.season_months);
    info!(
        horizon_days = forecast.len(),
        in_season = partition.in_season.len(),
        out_of_season = partition.out_of_season.len(),
        "Forecast partitioned"
    );

    Ok(RunOutput {
        history,
        years: request.years,
        forecast,
        partition,
    })
}
