//! CLI entry point for the rainfall forecasting tool.
//!
//! Provides subcommands for resolving a location, inspecting its historical
//! rainfall and detected wet season, and producing a multi-year forecast
//! split into in-season and out-of-season windows.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use rainfall_forecast::{
    config::{ModelConfig, ResolverConfig, ServiceConfig},
    infra::{nominatim::NominatimClient, open_meteo::OpenMeteoArchiveClient},
    output::{append_record, print_json, write_forecast_csv, write_table},
    pipeline::{self, HistoryOutput, PipelineConfig, RunRequest},
    resolver::resolve,
    stats::RunSummary,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rainfall_forecast")]
#[command(about = "Seasonal rainfall history and forecasts for any location", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct LocationArgs {
    /// Free-text location, e.g. a city name
    #[arg(short, long, default_value = "Mumbai")]
    location: String,

    /// Geocoding attempts before giving up on an unavailable service
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Seconds to wait between geocoding attempts
    #[arg(long, default_value_t = 5)]
    retry_delay: u64,
}

impl LocationArgs {
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            attempts: self.attempts,
            delay: Duration::from_secs(self.retry_delay),
        }
    }
}

#[derive(Args, Clone)]
struct RangeArgs {
    /// First day of history (YYYY-MM-DD)
    #[arg(short, long, default_value = "2015-01-01")]
    start: NaiveDate,

    /// Last day of history (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    end: Option<NaiveDate>,
}

impl RangeArgs {
    fn end(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a location and print its coordinate and a map link
    Geocode {
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Fetch cleaned historical rainfall and detect the wet season
    History {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        range: RangeArgs,

        /// Print the historical series as a table
        #[arg(long, default_value_t = false)]
        tables: bool,
    },
    /// Run the full pipeline and write the forecast CSV
    Forecast {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        range: RangeArgs,

        /// Forecast horizon in years (1-10)
        #[arg(short, long, default_value_t = 1)]
        years: u32,

        /// Directory to write the forecast CSV into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Gzip compress the forecast CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Print history, forecast and seasonal split tables
        #[arg(long, default_value_t = false)]
        tables: bool,

        /// Log the run summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// CSV file to append the run summary to
        #[arg(long)]
        summary_log: Option<String>,

        /// JSON file overriding model hyperparameters
        #[arg(long)]
        model_config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/rainfall_forecast.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rainfall_forecast.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let services = ServiceConfig::from_env();

    let result = match cli.command {
        Commands::Geocode { location } => geocode(&services, &location).await,
        Commands::History {
            location,
            range,
            tables,
        } => history(&services, &location, &range, tables).await,
        Commands::Forecast {
            location,
            range,
            years,
            output_dir,
            gzip,
            tables,
            json,
            summary_log,
            model_config,
        } => {
            let model = match model_config {
                Some(path) => ModelConfig::load(&path)?,
                None => ModelConfig::default(),
            };
            let config = PipelineConfig {
                resolver: location.resolver_config(),
                model,
            };
            let request = RunRequest {
                location: location.location.clone(),
                start: range.start,
                end: range.end(),
                years,
            };
            forecast(
                &services,
                &request,
                &config,
                &output_dir,
                gzip,
                tables,
                json,
                summary_log.as_deref(),
            )
            .await
        }
    };

    if let Err(e) = &result {
        error!(error = %e, "Run failed");
    }
    result
}

async fn geocode(services: &ServiceConfig, args: &LocationArgs) -> Result<()> {
    let geocoder = NominatimClient::from_config(services)?;
    let place = resolve(&geocoder, &args.location, &args.resolver_config()).await?;

    println!("Selected Location: {}", place.display_name);
    println!("Coordinate: {}", place.coordinate);
    println!("Map: {}", place.coordinate.map_url());
    Ok(())
}

async fn history(
    services: &ServiceConfig,
    location: &LocationArgs,
    range: &RangeArgs,
    tables: bool,
) -> Result<()> {
    let geocoder = NominatimClient::from_config(services)?;
    let archive = OpenMeteoArchiveClient::from_config(services)?;
    let request = RunRequest {
        location: location.location.clone(),
        start: range.start,
        end: range.end(),
        years: 1,
    };
    let config = PipelineConfig {
        resolver: location.resolver_config(),
        ..Default::default()
    };

    let out = pipeline::run_history(&geocoder, &archive, &request, &config).await?;
    print_history(&out, tables)?;
    Ok(())
}

fn print_history(out: &HistoryOutput, tables: bool) -> Result<()> {
    println!("Selected Location: {}", out.place.display_name);
    println!("Coordinate: {}", out.place.coordinate);
    println!("Range: {} to {}", out.start, out.end);
    println!(
        "Days returned: {}, days with rainfall: {}",
        out.raw_days,
        out.history.len()
    );
    println!("Season months: {}", out.season_months);

    if tables {
        let mut stdout = std::io::stdout().lock();
        write_table(
            &mut stdout,
            "Historical rainfall",
            "Precipitation (mm)",
            out.history.observations(),
        )?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(location = %request.location, years = request.years))]
async fn forecast(
    services: &ServiceConfig,
    request: &RunRequest,
    config: &PipelineConfig,
    output_dir: &Path,
    gzip: bool,
    tables: bool,
    json: bool,
    summary_log: Option<&str>,
) -> Result<()> {
    let geocoder = NominatimClient::from_config(services)?;
    let archive = OpenMeteoArchiveClient::from_config(services)?;

    let out = pipeline::run(&geocoder, &archive, request, config).await?;
    print_history(&out.history, tables)?;

    if tables {
        let mut stdout = std::io::stdout().lock();
        write_table(
            &mut stdout,
            "Forecast",
            "Forecasted Rainfall",
            out.forecast.points(),
        )?;
        write_table(
            &mut stdout,
            "In-season forecast",
            "Forecasted Rainfall",
            &out.partition.in_season,
        )?;
        write_table(
            &mut stdout,
            "Out-of-season forecast",
            "Forecasted Rainfall",
            &out.partition.out_of_season,
        )?;
    }

    let path = write_forecast_csv(output_dir, out.years, &out.forecast, gzip)?;
    println!("Forecast written to {}", path.display());

    let summary = RunSummary::from_output(&request.location, &out);
    if json {
        print_json(&summary)?;
    }
    if let Some(log_path) = summary_log {
        append_record(log_path, &summary)?;
        info!(path = log_path, "Run summary appended");
    }
    Ok(())
}
