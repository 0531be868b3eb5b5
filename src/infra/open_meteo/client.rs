use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::parser::parse_daily_archive;
use crate::services::geocoder::Coordinate;
use crate::services::weather_archive::{RawObservation, WeatherArchive};

const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Historical daily precipitation from the Open-Meteo archive API.
pub struct OpenMeteoArchiveClient<C> {
    client: C,
    base_url: String,
}

impl OpenMeteoArchiveClient<UrlParam<BasicClient>> {
    /// Builds a client that sends `apikey` only when `OPEN_METEO_API_KEY` is set.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = UrlParam {
            inner: BasicClient::new(ARCHIVE_TIMEOUT)?,
            param_name: "apikey".to_string(),
            key: config.archive_api_key.clone(),
        };
        Ok(Self::with_client(client, &config.archive_url))
    }
}

impl<C> OpenMeteoArchiveClient<C> {
    pub fn with_client(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn archive_url(&self, coord: Coordinate, start: NaiveDate, end: NaiveDate) -> Result<Url> {
        let url = Url::parse_with_params(
            &format!("{}/v1/archive", self.base_url),
            &[
                ("latitude", format!("{:.4}", coord.latitude)),
                ("longitude", format!("{:.4}", coord.longitude)),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("daily", "precipitation_sum".to_string()),
                ("timezone", "UTC".to_string()),
            ],
        )
        .context("invalid archive URL")?;
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> WeatherArchive for OpenMeteoArchiveClient<C> {
    #[tracing::instrument(skip(self, coord), fields(coord = %coord))]
    async fn daily_precipitation(
        &self,
        coord: Coordinate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>> {
        let url = self.archive_url(coord, start, end)?;
        let bytes = fetch_bytes(&self.client, url.as_str()).await?;
        debug!(bytes = bytes.len(), "Archive payload received, parsing");

        parse_daily_archive(&bytes)
    }
}
