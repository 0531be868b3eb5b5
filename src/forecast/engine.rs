//! Scale, fit, forecast, unscale, date.

use chrono::NaiveDate;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::{FitWindow, ModelConfig};
use crate::error::{RainfallError, Result};
use crate::forecast::sarima::FitOptions;
use crate::forecast::scaling::MinMaxScaler;
use crate::history::HistoricalSeries;

/// Days per forecast year; leap days are ignored.
pub const DAYS_PER_YEAR: usize = 365;
pub const MAX_HORIZON_YEARS: u32 = 10;

/// One forecast day. Serializes as a `Date,Forecasted Rainfall` row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    /// May be negative: the model does not enforce non-negative rainfall.
    #[serde(rename = "Forecasted Rainfall")]
    pub forecasted_mm: f64,
}

/// Consecutive daily forecast values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.forecasted_mm).collect()
    }

    pub fn negative_count(&self) -> usize {
        self.points.iter().filter(|p| p.forecasted_mm < 0.0).count()
    }
}

impl From<Vec<ForecastPoint>> for ForecastSeries {
    fn from(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }
}

/// Converts a horizon in whole years (1–10) to days at 365 days per year.
pub fn horizon_days(years: u32) -> Result<usize> {
    if !(1..=MAX_HORIZON_YEARS).contains(&years) {
        return Err(RainfallError::InvalidHorizon { years });
    }
    Ok(years as usize * DAYS_PER_YEAR)
}

/// Fits the configured seasonal ARIMA model and forecasts daily rainfall.
pub struct ForecastEngine {
    config: ModelConfig,
}

impl ForecastEngine {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of leading observations used for fitting.
    pub fn training_size(&self, len: usize) -> usize {
        match self.config.fit_window {
            FitWindow::Training => (len as f64 * self.config.train_fraction) as usize,
            FitWindow::Full => len,
        }
    }

    /// Forecasts `horizon_days` values dated consecutively from `first_date`.
    ///
    /// With [`FitWindow::Training`] the model's origin is the end of the
    /// training slice while the dates start at `first_date`; the offset is
    /// kept as is. Forecast values are not clamped at zero.
    #[tracing::instrument(skip(self, series), fields(observations = series.len()))]
    pub fn forecast(
        &self,
        series: &HistoricalSeries,
        horizon_days: usize,
        first_date: NaiveDate,
    ) -> Result<ForecastSeries> {
        let values = series.values();
        let train = &values[..self.training_size(values.len())];

        let scaler = MinMaxScaler::fit(train)?;
        let scaled = scaler.transform(train);

        let spec = self.config.sarima_spec();
        let budget = Duration::from_secs(self.config.max_fit_seconds);
        let options = FitOptions {
            max_iterations: self.config.max_iterations,
            deadline: Instant::now().checked_add(budget),
            budget_secs: self.config.max_fit_seconds,
        };
        let model = spec.fit(&scaled, &options)?;
        info!(
            training = train.len(),
            held_out = values.len() - train.len(),
            iterations = model.iterations(),
            sigma2 = model.sigma2(),
            ar = ?model.ar_coefficients(),
            seasonal_ar = ?model.seasonal_ar_coefficients(),
            seasonal_ma = ?model.seasonal_ma_coefficients(),
            "Model fitted"
        );

        let forecast = scaler.inverse_transform(&model.predict(horizon_days));
        let points: Vec<ForecastPoint> = first_date
            .iter_days()
            .zip(forecast)
            .map(|(date, forecasted_mm)| ForecastPoint {
                date,
                forecasted_mm,
            })
            .collect();

        let series = ForecastSeries::from(points);
        let negatives = series.negative_count();
        if negatives > 0 {
            warn!(negatives, "Forecast contains negative rainfall values");
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Order, SeasonalOrder};
    use crate::services::weather_archive::RawObservation;
    use chrono::Datelike;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Daily rainfall with a wet June–September and sparse showers otherwise.
    fn monsoon_history(start: NaiveDate, end: NaiveDate) -> HistoricalSeries {
        let raw: Vec<_> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .enumerate()
            .map(|(i, date)| {
                let mm = match date.month() {
                    6..=9 => 8.0 + (i % 7) as f64 * 3.0,
                    _ if i % 10 == 0 => 1.0 + (i % 3) as f64,
                    _ => 0.0,
                };
                RawObservation {
                    date,
                    precipitation_mm: Some(mm),
                }
            })
            .collect();
        HistoricalSeries::from_raw(&raw)
    }

    #[test]
    fn test_horizon_days() {
        assert_eq!(horizon_days(1).unwrap(), 365);
        assert_eq!(horizon_days(10).unwrap(), 3650);
        assert!(matches!(
            horizon_days(0),
            Err(RainfallError::InvalidHorizon { years: 0 })
        ));
        assert!(horizon_days(11).is_err());
    }

    #[test]
    fn test_training_size_truncates() {
        let engine = ForecastEngine::new(ModelConfig::default()).unwrap();
        assert_eq!(engine.training_size(10), 8);
        assert_eq!(engine.training_size(47), 37);

        let full = ForecastEngine::new(ModelConfig {
            fit_window: FitWindow::Full,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(full.training_size(47), 47);
    }

    #[test]
    fn test_forecast_dates_start_at_first_date() {
        let history = monsoon_history(day(2015, 1, 1), day(2017, 12, 31));
        let engine = ForecastEngine::new(ModelConfig::default()).unwrap();

        let forecast = engine.forecast(&history, 365, day(2018, 1, 1)).unwrap();
        assert_eq!(forecast.len(), 365);
        assert_eq!(forecast.points()[0].date, day(2018, 1, 1));
        assert_eq!(forecast.points()[364].date, day(2018, 12, 31));
        assert!(forecast.points().windows(2).all(|w| w[1].date == w[0].date.succ_opt().unwrap()));
        assert!(forecast.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_single_valued_training_is_degenerate() {
        let raw: Vec<_> = day(2015, 1, 1)
            .iter_days()
            .take(100)
            .map(|date| RawObservation {
                date,
                precipitation_mm: Some(4.0),
            })
            .collect();
        let engine = ForecastEngine::new(ModelConfig::default()).unwrap();
        let err = engine
            .forecast(&HistoricalSeries::from_raw(&raw), 365, day(2015, 4, 11))
            .unwrap_err();
        assert!(matches!(err, RainfallError::DegenerateSeries { .. }));
    }

    #[test]
    fn test_short_training_is_insufficient() {
        let raw: Vec<_> = day(2015, 1, 1)
            .iter_days()
            .take(30)
            .enumerate()
            .map(|(i, date)| RawObservation {
                date,
                precipitation_mm: Some(1.0 + i as f64),
            })
            .collect();
        let engine = ForecastEngine::new(ModelConfig::default()).unwrap();
        let err = engine
            .forecast(&HistoricalSeries::from_raw(&raw), 365, day(2015, 1, 31))
            .unwrap_err();
        assert!(matches!(
            err,
            RainfallError::InsufficientData {
                required: 38,
                actual: 24
            }
        ));
    }

    #[test]
    fn test_custom_orders() {
        let history = monsoon_history(day(2016, 1, 1), day(2017, 12, 31));
        let engine = ForecastEngine::new(ModelConfig {
            order: Order { p: 1, d: 1, q: 1 },
            seasonal_order: SeasonalOrder {
                p: 0,
                d: 0,
                q: 0,
                period: 12,
            },
            fit_window: FitWindow::Full,
            ..Default::default()
        })
        .unwrap();
        let forecast = engine.forecast(&history, 30, day(2018, 1, 1)).unwrap();
        assert_eq!(forecast.len(), 30);
    }

    #[test]
    fn test_negative_count() {
        let series = ForecastSeries::from(vec![
            ForecastPoint {
                date: day(2020, 1, 1),
                forecasted_mm: -0.4,
            },
            ForecastPoint {
                date: day(2020, 1, 2),
                forecasted_mm: 2.0,
            },
        ]);
        assert_eq!(series.negative_count(), 1);
    }
}
