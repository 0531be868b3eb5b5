//! Error taxonomy for a forecasting run.
//!
//! Every variant aborts the remainder of the pipeline for that run and is
//! meant to be shown to the user as-is.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures that stop a pipeline run.
#[derive(Error, Debug)]
pub enum RainfallError {
    /// The geocoding service stayed unavailable for every attempt.
    #[error("Unable to connect to the geolocation service after {attempts} attempts")]
    TransientServiceUnavailable { attempts: u32 },

    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    #[error("No rainfall data available between {start} and {end}")]
    EmptyHistoricalData { start: NaiveDate, end: NaiveDate },

    /// Training values collapse to a single value, so min-max scaling is undefined.
    #[error("Training series is degenerate: every value equals {value}")]
    DegenerateSeries { value: f64 },

    #[error("Not enough observations to fit the model: required {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Forecast horizon must be between 1 and 10 years, got {years}")]
    InvalidHorizon { years: u32 },

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Model fit exceeded its time budget of {seconds}s")]
    FitTimedOut { seconds: u64 },

    /// Transport or decoding failure of an external service.
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RainfallError>;
