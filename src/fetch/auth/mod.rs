//! Request decorators for [`HttpClient`]: fixed headers (Nominatim wants an
//! identifying `User-Agent`) and optional query-string keys (Open-Meteo's
//! commercial endpoints take `apikey`).

use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, USER_AGENT};

/// An [`HttpClient`] wrapper that sets one header on every request.
pub struct WithHeader<C> {
    inner: C,
    name: HeaderName,
    value: HeaderValue,
}

impl<C> WithHeader<C> {
    pub fn new(inner: C, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name '{name}'"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("invalid value for header '{name}'"))?;
        Ok(Self { inner, name, value })
    }

    pub fn user_agent(inner: C, agent: &str) -> Result<Self> {
        Self::new(inner, USER_AGENT.as_str(), agent)
    }

    fn decorate(&self, req: &mut reqwest::Request) {
        req.headers_mut().insert(self.name.clone(), self.value.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for WithHeader<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.decorate(&mut req);
        self.inner.execute(req).await
    }
}

/// An [`HttpClient`] wrapper that appends `param_name=key` to the query
/// string when a key is configured, and passes requests through otherwise.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: Option<String>,
}

impl<C> UrlParam<C> {
    fn decorate(&self, req: &mut reqwest::Request) {
        if let Some(key) = &self.key {
            req.url_mut()
                .query_pairs_mut()
                .append_pair(&self.param_name, key);
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.decorate(&mut req);
        self.inner.execute(req).await
    }
}
