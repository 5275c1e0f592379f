//! The NASA ADS / SciX API client.

use crate::config::ClientConfig;
use crate::error::{AdsError, Result};
use crate::rate_limit::RateLimiter;
use crate::types::RateLimits;
use reqwest::Client;
use std::time::Duration;

/// Async client for the ADS API.
///
/// The client is the explicit context every remote call goes through; wrap
/// it in an `Arc` to hand it to [`Article`](crate::Article) and
/// [`Journal`](crate::Journal) as their search backend.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> astroapi::error::Result<()> {
/// use astroapi::{AdsClient, SearchOptions};
///
/// let client = AdsClient::from_env()?;
/// let mut results = client.query("author:\"^Einstein\" year:1905", SearchOptions::default())?;
/// while let Some(record) = results.next().await {
///     println!("{}", record?["bibcode"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AdsClient {
    pub(crate) http: Client,
    pub(crate) token: String,
    pub(crate) base_url: String,
    pub(crate) user_agent: String,
    pub(crate) rate_limiter: RateLimiter,
}

impl AdsClient {
    /// Create a client with the given API token and default settings.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(token))
    }

    /// Create a client from a full configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(AdsError::AuthRequired);
        }
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            token: config.token,
            base_url: config.base_url,
            user_agent: config.user_agent,
            rate_limiter: RateLimiter::new(config.requests_per_second),
        })
    }

    /// Create a client from the environment or `~/.ads/dev_key`.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// The API root requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The quota ADS reported on the most recent response.
    pub async fn rate_limits(&self) -> RateLimits {
        self.rate_limiter.limits().await
    }

    /// Make an authenticated GET request to the ADS API.
    pub(crate) async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", &self.user_agent)
            .query(params)
            .send()
            .await?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;
        handle_response(response).await
    }

    /// Make an authenticated POST request with a JSON body.
    pub(crate) async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;
        handle_response(response).await
    }

    /// Make an authenticated PUT request with a JSON body.
    pub(crate) async fn put_json(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "PUT");
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", &self.user_agent)
            .json(body)
            .send()
            .await?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;
        handle_response(response).await
    }

    /// Make an authenticated DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "DELETE");
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;
        handle_response(response).await
    }

    /// Fetch an absolute URL outside the API (publisher or arXiv PDFs).
    ///
    /// No token is sent; publishers answer bot user agents with captchas,
    /// so a browser-like agent is used.
    pub(crate) async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(%url, "download");
        let response = self
            .http
            .get(url)
            .header(
                "User-Agent",
                "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
            )
            .header("Accept", "*/*")
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(AdsError::from_status(status, &body, None));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl std::fmt::Debug for AdsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Handle the HTTP response, mapping status codes to errors.
async fn handle_response(response: reqwest::Response) -> Result<String> {
    let status = response.status().as_u16();
    if (200..=299).contains(&status) {
        return Ok(response.text().await?);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status, "request failed");
    Err(AdsError::from_status(status, &body, retry_after))
}
