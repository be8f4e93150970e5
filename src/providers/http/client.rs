//! reqwest-backed [`HttpFetcher`].

use async_trait::async_trait;
use std::time::Duration;

use super::{FetchError, FetchResponse, HttpFetcher};
use crate::config::HttpSettings;

/// Sends unsubscribe requests with a shared `reqwest::Client`.
///
/// Redirects are followed with reqwest's default policy (up to 10 hops), so
/// the reported status is the one at the end of the chain.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the given `User-Agent` and optional timeout.
    ///
    /// With no timeout, requests wait as long as the OS lets them.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Request(format!("build client: {}", e)))?;

        Ok(Self { client })
    }

    /// Creates a fetcher from HTTP settings.
    pub fn from_settings(settings: &HttpSettings) -> Result<Self, FetchError> {
        Self::new(
            &settings.user_agent,
            settings.timeout_seconds.map(Duration::from_secs),
        )
    }

    /// Classifies a reqwest error into a [`FetchError`].
    fn classify(err: reqwest::Error) -> FetchError {
        let message = err.to_string();
        if err.is_builder() {
            FetchError::InvalidUrl(message)
        } else if err.is_timeout() {
            FetchError::Timeout(message)
        } else if err.is_connect() {
            FetchError::Connect(message)
        } else {
            FetchError::Request(message)
        }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status().as_u16();
        tracing::debug!(url, status, final_url = %response.url(), "fetched");
        Ok(FetchResponse::new(status))
    }
}
