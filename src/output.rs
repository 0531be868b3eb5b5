//! Output formatting and persistence for historical series, forecasts and
//! run summaries.
//!
//! Supports plain-text tables, JSON logging, forecast CSV export (optionally
//! gzip-compressed) and CSV append of run summaries.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::forecast::engine::{ForecastPoint, ForecastSeries};
use crate::history::HistoricalObservation;
use crate::stats::RunSummary;
use csv::WriterBuilder;

/// `rainfall_forecast_<years>_years.csv`
pub fn forecast_file_name(years: u32) -> String {
    format!("rainfall_forecast_{years}_years.csv")
}

/// Encodes the forecast as CSV text with the `Date,Forecasted Rainfall` header.
pub fn forecast_csv_bytes(forecast: &ForecastSeries) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for point in forecast.points() {
        writer.serialize(point)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish forecast CSV: {}", e.error()))
}

/// Writes the forecast CSV into `dir`, creating it if needed. With `gzip` the
/// file gets a `.gz` suffix. Returns the written path.
#[tracing::instrument(skip(forecast), fields(points = forecast.len()))]
pub fn write_forecast_csv(
    dir: &Path,
    years: u32,
    forecast: &ForecastSeries,
    gzip: bool,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let csv = forecast_csv_bytes(forecast)?;
    let (body, path) = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&csv)?;
        let compressed = encoder.finish()?;
        (compressed, dir.join(format!("{}.gz", forecast_file_name(years))))
    } else {
        (csv, dir.join(forecast_file_name(years)))
    };

    std::fs::write(&path, &body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = body.len(), gzip, "Forecast written");
    Ok(path)
}

/// A `(date, millimetres)` row of a displayed table.
pub trait TableRow {
    fn date(&self) -> NaiveDate;
    fn millimetres(&self) -> f64;
}

impl TableRow for HistoricalObservation {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn millimetres(&self) -> f64 {
        self.precipitation_mm
    }
}

impl TableRow for ForecastPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn millimetres(&self) -> f64 {
        self.forecasted_mm
    }
}

/// Writes a titled two-column table.
pub fn write_table<W: Write, R: TableRow>(
    out: &mut W,
    title: &str,
    value_header: &str,
    rows: &[R],
) -> Result<()> {
    writeln!(out, "{title} ({} rows)", rows.len())?;
    writeln!(out, "{:<12}{:>22}", "Date", value_header)?;
    for row in rows {
        writeln!(out, "{:<12}{:>22.3}", row.date().to_string(), row.millimetres())?;
    }
    writeln!(out)?;
    Ok(())
}

/// Logs any serializable record as pretty-printed JSON.
pub fn print_json<T: Serialize>(record: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Appends a [`RunSummary`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, summary: &RunSummary) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}
