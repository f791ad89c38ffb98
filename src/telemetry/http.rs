//! HTTP state-API sink
//!
//! Each update is POSTed as `{"state", "attributes"}` to
//! `<base_url>/api/states/sensor.<name>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::sensors::SensorUpdate;
use super::sink::TelemetrySink;
use crate::config::SinkConfig;
use crate::error::{MvmpError, Result};

/// Sink publishing to a home-automation state API
pub struct HttpSink {
    client: Client,
    base_url: Url,
    token: Option<String>,
    published: u64,
}

impl std::fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSink")
            .field("base_url", &self.base_url.as_str())
            .field("published", &self.published)
            .finish_non_exhaustive()
    }
}

impl HttpSink {
    /// Create a sink for the API at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL does not parse or the HTTP client cannot be built
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MvmpError::Sink(format!("Invalid sink url {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MvmpError::Sink(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token,
            published: 0,
        })
    }

    /// Build from the `[sink]` section; `None` when no url is configured
    pub fn from_config(config: &SinkConfig) -> Result<Option<Self>> {
        match &config.url {
            Some(url) => Self::new(
                url,
                config.token.clone(),
                Duration::from_millis(config.timeout_ms),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// Endpoint receiving the given update
    pub fn state_url(&self, update: &SensorUpdate) -> Result<Url> {
        let url = format!(
            "{}/api/states/{}",
            self.base_url.as_str().trim_end_matches('/'),
            update.entity_id()
        );
        Url::parse(&url).map_err(|e| MvmpError::Sink(format!("Invalid state url {}: {}", url, e)))
    }

    /// Updates accepted by the API so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    async fn publish(&mut self, update: &SensorUpdate) -> Result<()> {
        let url = self.state_url(update)?;

        let mut request = self.client.post(url).json(&update.state_body());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MvmpError::Sink(format!("Request for {} failed: {}", update.entity_id(), e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MvmpError::Sink(format!("HTTP {} - {}", status, body)));
        }

        debug!("Updated {} = {}", update.entity_id(), update.state);
        self.published += 1;
        Ok(())
    }
}
