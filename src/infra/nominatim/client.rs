use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::fetch::auth::WithHeader;
use crate::fetch::{BasicClient, HttpClient};
use crate::parser::parse_geocode;
use crate::services::geocoder::{GeocodeError, Geocoder, Place};

/// Per-request timeout of a geocoding call.
pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Geocoder backed by the Nominatim `/search` endpoint.
pub struct NominatimClient<C> {
    client: C,
    base_url: String,
}

impl NominatimClient<WithHeader<BasicClient>> {
    /// Builds a client that identifies itself with the configured user agent,
    /// as required by the Nominatim usage policy.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let client = WithHeader::user_agent(
            BasicClient::new(GEOCODE_TIMEOUT)?,
            &config.geocoder_user_agent,
        )?;
        Ok(Self::with_client(client, &config.geocoder_url))
    }
}

impl<C> NominatimClient<C> {
    pub fn with_client(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, GeocodeError> {
        Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", query), ("format", "json"), ("limit", "1")],
        )
        .map_err(|e| GeocodeError::Failed(format!("invalid geocoder URL: {e}")))
    }
}

/// Maps a non-success HTTP status onto the retry taxonomy.
fn classify_status(status: StatusCode) -> GeocodeError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        GeocodeError::Unavailable(format!("status {status}"))
    } else {
        GeocodeError::Failed(format!("status {status}"))
    }
}

#[async_trait]
impl<C: HttpClient> Geocoder for NominatimClient<C> {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
        let url = self.search_url(query)?;
        let req = reqwest::Request::new(reqwest::Method::GET, url);

        let response = self
            .client
            .execute(req)
            .await
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(%status, "Geocoder responded");
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        parse_geocode(&body).map_err(|e| GeocodeError::Failed(format!("{e:#}")))
    }
}
