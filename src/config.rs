//! Client configuration and API token discovery.

use crate::error::{AdsError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ADS API root.
pub const DEFAULT_BASE_URL: &str = "https://api.adsabs.harvard.edu/v1";

/// Environment variables checked for a token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["SCIX_API_TOKEN", "ADS_API_TOKEN", "ADS_DEV_KEY"];

/// Settings for an [`AdsClient`](crate::AdsClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token sent with every request.
    pub token: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Local pacing of outgoing requests.
    pub requests_per_second: f64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration with the given token and default settings.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            requests_per_second: 5.0,
            user_agent: format!("astroapi/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Discover a token from the environment, then from `~/.ads/dev_key`.
    ///
    /// `ADS_BASE_URL` overrides the API root when set.
    pub fn from_env() -> Result<Self> {
        let from_vars = TOKEN_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty());

        let token = match from_vars {
            Some(token) => token,
            None => match default_token_path() {
                Some(path) => token_from_file(&path)?.ok_or(AdsError::AuthRequired)?,
                None => return Err(AdsError::AuthRequired),
            },
        };

        let config = Self::new(token);
        match std::env::var("ADS_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => config.with_base_url(url),
            _ => Ok(config),
        }
    }

    /// Override the API root. Must be an absolute http(s) URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| AdsError::Config(format!("invalid base URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AdsError::Config(format!(
                "base URL must be http or https: {}",
                base_url
            )));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the local request rate.
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.requests_per_second = per_second;
        self
    }
}

/// `~/.ads/dev_key`, if a home directory is known.
pub fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ads").join("dev_key"))
}

/// Read a token from the first line of `path`.
///
/// A missing file or an empty first line is `Ok(None)`.
pub fn token_from_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let token = contents.lines().next().unwrap_or("").trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}

/// Write `token` to `path`, creating parent directories.
pub fn save_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", token.trim()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ads").join("dev_key");

        assert_eq!(token_from_file(&path).unwrap(), None);
        save_token(&path, "  abc123  ").unwrap();
        assert_eq!(token_from_file(&path).unwrap(), Some("abc123".to_string()));
    }

    #[test]
    fn test_token_file_empty_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev_key");
        std::fs::write(&path, "\nsecond line\n").unwrap();
        assert_eq!(token_from_file(&path).unwrap(), None);
    }

    #[test]
    fn test_base_url_validation() {
        let config = ClientConfig::new("t")
            .with_base_url("http://localhost:1234/v1/")
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:1234/v1");

        assert!(matches!(
            ClientConfig::new("t").with_base_url("not a url"),
            Err(AdsError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("t").with_base_url("ftp://example.org"),
            Err(AdsError::Config(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("t");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("astroapi/"));
    }
}
