//! HTTP client for the telemetry service.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{ReadingFeed, TelemetrySource};
use crate::error::FetchError;

const DEFAULT_ENDPOINT: &str = "http://localhost:8081";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Telemetry source backed by the service's JSON API.
///
/// # Example
///
/// ```rust,no_run
/// use soundwatch::source::{HttpSource, ReadingFeed, TelemetrySource};
///
/// # tokio_test::block_on(async {
/// let source = HttpSource::builder()
///     .endpoint("http://localhost:8081")
///     .build()
///     .unwrap();
///
/// let body = source.fetch_readings(ReadingFeed::Sorted).await.unwrap();
/// println!("{}", body);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    endpoint: String,
    description: String,
}

impl HttpSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url(path);
        debug!(%url, "GET");

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "API returned status {} for {}",
                response.status(),
                path
            )));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    async fn fetch_readings(&self, feed: ReadingFeed) -> Result<Value, FetchError> {
        self.get_json(feed.path(), &[]).await
    }

    async fn fetch_sensors(&self) -> Result<Value, FetchError> {
        self.get_json("/sensors", &[]).await
    }

    async fn fetch_logs(&self, limit: NonZeroU32) -> Result<Value, FetchError> {
        self.get_json("/logs/limit", &[("limit_amount", limit.to_string())])
            .await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for HttpSource.
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Set the service base URL (e.g., "http://localhost:8081").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<HttpSource, FetchError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let description = format!("http: {}", endpoint);

        Ok(HttpSource {
            client,
            endpoint,
            description,
        })
    }
}
