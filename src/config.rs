use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GATEWAY_TEMPLATE: &str = "https://{cid}.ipfs.w3s.link";
pub const DEFAULT_UPLOAD_URL: &str = "https://api.web3.storage/upload";

/// Settings for one [`GatewayClient`](crate::GatewayClient) instance.
///
/// Durations are stored in milliseconds so the struct round-trips through
/// JSON config files unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_token: Option<String>,
    /// `{cid}` is replaced by the identifier. Without the placeholder the
    /// value is treated as a base URL and `/<cid>` is appended.
    pub gateway_url: String,
    pub upload_url: String,
    /// Send the bearer token on gateway reads too. Public gateways do not
    /// need it, so it is off by default.
    pub auth_gateway_reads: bool,
    pub max_concurrent_requests: usize,
    pub rate_limit_per_window: u32,
    pub rate_window_ms: u64,
    pub request_timeout_ms: u64,
    pub retry_attempts: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_token: None,
            gateway_url: DEFAULT_GATEWAY_TEMPLATE.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            auth_gateway_reads: false,
            max_concurrent_requests: 10,
            rate_limit_per_window: 5,
            rate_window_ms: 1000,
            request_timeout_ms: 30_000,
            retry_attempts: 3,
            backoff_min_ms: 4000,
            backoff_max_ms: 10_000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StorageError::Config(format!("Invalid {}: {}", key, raw))),
        _ => Ok(None),
    }
}

impl ClientConfig {
    /// Build configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// Token: `SIGNVAULT_STORAGE_TOKEN`, then `WEB3_STORAGE_TOKEN`.
    /// Optional: `SIGNVAULT_GATEWAY_URL`, `SIGNVAULT_UPLOAD_URL`,
    /// `SIGNVAULT_AUTH_GATEWAY_READS`,
    /// `SIGNVAULT_MAX_CONCURRENT_REQUESTS`, `SIGNVAULT_RATE_LIMIT_PER_SECOND`,
    /// `SIGNVAULT_TIMEOUT_SECS`, `SIGNVAULT_RETRY_ATTEMPTS`,
    /// `SIGNVAULT_BACKOFF_MIN_MS`, `SIGNVAULT_BACKOFF_MAX_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = ClientConfig::default();

        config.api_token = env::var("SIGNVAULT_STORAGE_TOKEN")
            .or_else(|_| env::var("WEB3_STORAGE_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());

        if let Ok(url) = env::var("SIGNVAULT_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Ok(url) = env::var("SIGNVAULT_UPLOAD_URL") {
            config.upload_url = url;
        }
        if let Some(flag) = env_parse("SIGNVAULT_AUTH_GATEWAY_READS")? {
            config.auth_gateway_reads = flag;
        }
        if let Some(n) = env_parse("SIGNVAULT_MAX_CONCURRENT_REQUESTS")? {
            config.max_concurrent_requests = n;
        }
        if let Some(n) = env_parse("SIGNVAULT_RATE_LIMIT_PER_SECOND")? {
            config.rate_limit_per_window = n;
        }
        if let Some(secs) = env_parse::<u64>("SIGNVAULT_TIMEOUT_SECS")? {
            config.request_timeout_ms = secs.checked_mul(1000).ok_or_else(|| {
                StorageError::Config(format!("SIGNVAULT_TIMEOUT_SECS out of range: {}", secs))
            })?;
        }
        if let Some(n) = env_parse("SIGNVAULT_RETRY_ATTEMPTS")? {
            config.retry_attempts = n;
        }
        if let Some(ms) = env_parse("SIGNVAULT_BACKOFF_MIN_MS")? {
            config.backoff_min_ms = ms;
        }
        if let Some(ms) = env_parse("SIGNVAULT_BACKOFF_MAX_MS")? {
            config.backoff_max_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ClientConfig = serde_json::from_str(&content).map_err(|e| {
            StorageError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        tracing::info!(
            "Loaded client config from {}: max_concurrent={}, rate_limit={}/{}ms",
            path.display(),
            config.max_concurrent_requests,
            config.rate_limit_per_window,
            config.rate_window_ms
        );
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(StorageError::Config(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }
        if self.rate_limit_per_window == 0 {
            return Err(StorageError::Config(
                "rate_limit_per_window must be at least 1".into(),
            ));
        }
        if self.rate_window_ms == 0 {
            return Err(StorageError::Config("rate_window_ms must be positive".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(StorageError::Config(
                "request_timeout_ms must be positive".into(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(StorageError::Config(
                "retry_attempts must be at least 1".into(),
            ));
        }
        if self.backoff_min_ms > self.backoff_max_ms {
            return Err(StorageError::Config(format!(
                "backoff_min_ms ({}) exceeds backoff_max_ms ({})",
                self.backoff_min_ms, self.backoff_max_ms
            )));
        }
        for (name, url) in [
            ("gateway_url", &self.gateway_url),
            ("upload_url", &self.upload_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(StorageError::Config(format!(
                    "{} must be an http(s) URL, got: {}",
                    name, url
                )));
            }
        }
        Ok(())
    }

    /// The credential, or a configuration error when none was supplied.
    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                StorageError::Config(
                    "API token not provided and SIGNVAULT_STORAGE_TOKEN / WEB3_STORAGE_TOKEN not set"
                        .into(),
                )
            })
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn backoff_min(&self) -> Duration {
        Duration::from_millis(self.backoff_min_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}
