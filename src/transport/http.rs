use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Duration;
use tracing::debug;

use super::{PageRequest, Transport};

/// Default timeout for a single page request (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches pages with `POST {url}/{offset}/{count}` and an empty body
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport whose requests fail after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, request: PageRequest) -> Result<Value> {
        let endpoint = request.endpoint(url);
        debug!(endpoint = %endpoint, "requesting page");

        let response = self
            .client
            .post(&endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("request to {} failed", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned {}", endpoint, status);
        }

        let page = response
            .json::<Value>()
            .await
            .with_context(|| format!("{} returned invalid JSON", endpoint))?;

        Ok(page)
    }
}
