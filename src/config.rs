//! Runtime configuration: service endpoints from the environment, model
//! hyperparameters from an optional JSON file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::error::RainfallError;
use crate::forecast::sarima::SarimaSpec;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com";
pub const DEFAULT_USER_AGENT: &str = "rainfall_app";

/// Endpoints and credentials for the external services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub archive_url: String,
    pub archive_api_key: Option<String>,
}

impl ServiceConfig {
    /// Reads `GEOCODER_URL`, `GEOCODER_USER_AGENT`, `ARCHIVE_URL` and
    /// `OPEN_METEO_API_KEY`, falling back to the public endpoints.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            geocoder_url: var("GEOCODER_URL").unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string()),
            geocoder_user_agent: var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            archive_url: var("ARCHIVE_URL").unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_string()),
            archive_api_key: var("OPEN_METEO_API_KEY"),
        }
    }
}

/// Retry policy of the location resolver.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Non-seasonal `(p, d, q)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal `(P, D, Q, s)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// Which slice of the cleaned history the model is fitted on.
///
/// `Training` keeps the 80/20 convention, so the model's forecast origin
/// sits before the displayed start date. `Full` fits on every observation
/// so the origin lines up with the end of the requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitWindow {
    #[default]
    Training,
    Full,
}

/// Hyperparameters of the forecast engine.
///
/// The orders are fixed, not selected from the data. A seasonal period of
/// 12 on a daily series is kept for parity with the established behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub order: Order,
    pub seasonal_order: SeasonalOrder,
    pub train_fraction: f64,
    pub fit_window: FitWindow,
    pub season_month_count: usize,
    pub max_iterations: usize,
    pub max_fit_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: Order { p: 5, d: 1, q: 0 },
            seasonal_order: SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                period: 12,
            },
            train_fraction: 0.8,
            fit_window: FitWindow::Training,
            season_month_count: 4,
            max_iterations: 2000,
            max_fit_seconds: 120,
        }
    }
}

impl ModelConfig {
    /// Loads the config from a JSON file at `path`. Missing fields keep
    /// their defaults:
    /// ```json
    /// { "order": { "p": 2, "d": 1, "q": 1 }, "fit_window": "full" }
    /// ```
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model config '{path}'"))?;
        let config: ModelConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model config '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), RainfallError> {
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(RainfallError::InvalidConfig(format!(
                "train_fraction must be in (0, 1], got {}",
                self.train_fraction
            )));
        }
        let seasonal = &self.seasonal_order;
        if seasonal.period < 2 && (seasonal.p + seasonal.d + seasonal.q) > 0 {
            return Err(RainfallError::InvalidConfig(
                "seasonal terms require a period of at least 2".to_string(),
            ));
        }
        if !(1..=12).contains(&self.season_month_count) {
            return Err(RainfallError::InvalidConfig(format!(
                "season_month_count must be between 1 and 12, got {}",
                self.season_month_count
            )));
        }
        if self.max_iterations == 0 {
            return Err(RainfallError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sarima_spec(&self) -> SarimaSpec {
        SarimaSpec {
            order: self.order,
            seasonal_order: self.seasonal_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_defaults_match_fixed_orders() {
        let config = ModelConfig::default();
        assert_eq!(config.order, Order { p: 5, d: 1, q: 0 });
        assert_eq!(config.seasonal_order.period, 12);
        assert_eq!(config.fit_window, FitWindow::Training);
        assert_eq!(config.season_month_count, 4);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let path = temp_path("rainfall_forecast_test_model.json");
        fs::write(&path, r#"{ "fit_window": "full", "train_fraction": 0.5 }"#).unwrap();

        let config = ModelConfig::load(&path).unwrap();
        assert_eq!(config.fit_window, FitWindow::Full);
        assert_eq!(config.train_fraction, 0.5);
        assert_eq!(config.order.p, 5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let config = ModelConfig {
            train_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RainfallError::InvalidConfig(_))
        ));
    }
}
