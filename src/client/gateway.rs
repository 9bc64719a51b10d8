use super::gate::ConcurrencyGate;
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use crate::config::ClientConfig;
use crate::error::{Result, StorageError};
use crate::provider::{parse_json, StorageProvider};
use crate::types::ContentIdentifier;
use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Upload API response. Only the identifier matters to the client.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    cid: String,
}

/// HTTP client for a content-addressed storage gateway and its upload API.
///
/// Every request passes through the shared rate limiter, then the
/// concurrency gate, then the retry policy. Clones share all of that state,
/// so one client (and its clones) can serve any number of concurrent calls
/// and batches without exceeding the configured ceilings.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<Inner>,
}

struct Inner {
    http_client: reqwest::Client,
    api_token: String,
    gateway_url: String,
    upload_url: String,
    auth_gateway_reads: bool,
    request_timeout: Duration,
    limiter: RateLimiter,
    gate: ConcurrencyGate,
    retry: RetryPolicy,
}

impl GatewayClient {
    /// Fails fast with [`StorageError::Config`] when the configuration is
    /// invalid or carries no API token.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let api_token = config.require_token()?.to_string();

        let http_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| StorageError::Config(format!("HTTP client: {}", e)))?;

        tracing::debug!(
            gateway = %config.gateway_url,
            max_concurrent = config.max_concurrent_requests,
            rate_limit = config.rate_limit_per_window,
            "storage gateway client created"
        );

        Ok(GatewayClient {
            inner: Arc::new(Inner {
                http_client,
                api_token,
                gateway_url: config.gateway_url.clone(),
                upload_url: config.upload_url.clone(),
                auth_gateway_reads: config.auth_gateway_reads,
                request_timeout: config.request_timeout(),
                limiter: RateLimiter::new(config.rate_limit_per_window, config.rate_window()),
                gate: ConcurrencyGate::new(config.max_concurrent_requests),
                retry: RetryPolicy::new(
                    config.retry_attempts,
                    config.backoff_min(),
                    config.backoff_max(),
                ),
            }),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Public gateway URL for an identifier. The identifier is
    /// percent-encoded so it always lands in a single path segment.
    pub fn gateway_url(&self, id: &ContentIdentifier) -> String {
        let template = &self.inner.gateway_url;
        let encoded = urlencoding::encode(id.as_str());
        if template.contains("{cid}") {
            template.replace("{cid}", &encoded)
        } else {
            format!("{}/{}", template.trim_end_matches('/'), encoded)
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.inner.gate
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    /// Admission → permit → retried request. The permit is held for the whole
    /// retry sequence; each retry is re-admitted by the rate limiter.
    async fn guarded<T, F, Fut>(&self, label: &str, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let inner = &*self.inner;
        inner.limiter.admit().await;
        let _permit = inner.gate.acquire().await?;

        inner
            .retry
            .execute(label, move |attempt| {
                let pending = request();
                async move {
                    if attempt > 1 {
                        inner.limiter.admit().await;
                    }
                    match tokio::time::timeout(inner.request_timeout, pending).await {
                        Ok(Err(StorageError::Timeout(d))) if d.is_zero() => {
                            Err(StorageError::Timeout(inner.request_timeout))
                        }
                        Ok(result) => result,
                        Err(_) => Err(StorageError::Timeout(inner.request_timeout)),
                    }
                }
            })
            .await
    }

    async fn get_once(&self, id: &ContentIdentifier) -> Result<Vec<u8>> {
        let url = self.gateway_url(id);
        tracing::debug!("GET {}", url);

        let mut request = self.inner.http_client.get(&url);
        if self.inner.auth_gateway_reads {
            request = request.bearer_auth(&self.inner.api_token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(status, id.as_str(), &body));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn post_once(&self, name: &str, payload: &[u8]) -> Result<ContentIdentifier> {
        tracing::debug!("POST {} ({} bytes, name={})", self.inner.upload_url, payload.len(), name);

        let response = self
            .inner
            .http_client
            .post(&self.inner.upload_url)
            .bearer_auth(&self.inner.api_token)
            .header("X-NAME", urlencoding::encode(name).into_owned())
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 404 from the upload API is a misconfigured endpoint, not missing content.
            return Err(match StorageError::from_status(status, name, &body) {
                StorageError::NotFound(_) => StorageError::Upstream {
                    status: Some(status.as_u16()),
                    message: format!("upload endpoint {} not found", self.inner.upload_url),
                },
                other => other,
            });
        }

        let body = response.bytes().await?;
        let parsed: UploadResponse = serde_json::from_slice(&body).map_err(|e| {
            StorageError::Parse(format!("upload response for {} has no cid: {}", name, e))
        })?;
        ContentIdentifier::new(parsed.cid).map_err(|e| {
            StorageError::Parse(format!("upload response for {}: {}", name, e))
        })
    }

    /// Raw payload for `id`.
    pub async fn fetch_bytes(&self, id: &ContentIdentifier) -> Result<Vec<u8>> {
        let label = format!("fetch {}", id);
        self.guarded(&label, || self.get_once(id))
            .await
            .map_err(|e| {
                tracing::debug!("Error retrieving {}: {}", id, e);
                e
            })
    }

    /// Fetch and parse as JSON. A parse failure is not retried.
    pub async fn fetch_json(&self, id: &ContentIdentifier) -> Result<serde_json::Value> {
        self.fetch_json_as(id).await
    }

    pub async fn fetch_json_as<T: serde::de::DeserializeOwned>(
        &self,
        id: &ContentIdentifier,
    ) -> Result<T> {
        let bytes = self.fetch_bytes(id).await?;
        parse_json(id, &bytes)
    }

    /// Fetch `id` and write it to `path` atomically. Nothing is written when
    /// the fetch fails.
    pub async fn save_to_path(&self, id: &ContentIdentifier, path: &Path) -> Result<PathBuf> {
        let bytes = self.fetch_bytes(id).await?;
        let saved = crate::utils::write_atomic_async(path.to_path_buf(), bytes).await?;
        tracing::debug!("Saved {} to {}", id, saved.display());
        Ok(saved)
    }

    /// Upload under an advisory display name. The returned identifier is
    /// authoritative. Uploads are retried like reads: the same bytes always
    /// resolve to the same identifier, so a repeated upload is harmless.
    pub async fn put_bytes(&self, name: &str, payload: &[u8]) -> Result<ContentIdentifier> {
        let label = format!("upload {}", name);
        let id = self
            .guarded(&label, || self.post_once(name, payload))
            .await
            .map_err(|e| {
                tracing::error!("Error uploading {}: {}", name, e);
                e
            })?;
        tracing::info!("Uploaded {} ({} bytes) as {}", name, payload.len(), id);
        Ok(id)
    }

    pub async fn put_json(&self, value: &serde_json::Value, name: &str) -> Result<ContentIdentifier> {
        self.put_json_as(value, name).await
    }

    pub async fn put_json_as<T: serde::Serialize + ?Sized>(
        &self,
        value: &T,
        name: &str,
    ) -> Result<ContentIdentifier> {
        let payload = serde_json::to_vec(value)?;
        self.put_bytes(name, &payload).await
    }

    /// Upload a local file under its file name.
    pub async fn put_file(&self, path: &Path) -> Result<ContentIdentifier> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::Io(format!("not a file: {}", path.display())))?;
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))?;
        self.put_bytes(&name, &payload).await
    }
}

#[async_trait]
impl StorageProvider for GatewayClient {
    async fn fetch_bytes(&self, id: &ContentIdentifier) -> Result<Vec<u8>> {
        GatewayClient::fetch_bytes(self, id).await
    }

    async fn put_bytes(&self, name: &str, payload: &[u8]) -> Result<ContentIdentifier> {
        GatewayClient::put_bytes(self, name, payload).await
    }

    async fn fetch_json(&self, id: &ContentIdentifier) -> Result<serde_json::Value> {
        GatewayClient::fetch_json(self, id).await
    }

    async fn save_to_path(&self, id: &ContentIdentifier, path: &Path) -> Result<PathBuf> {
        GatewayClient::save_to_path(self, id, path).await
    }

    async fn put_json(&self, value: &serde_json::Value, name: &str) -> Result<ContentIdentifier> {
        GatewayClient::put_json(self, value, name).await
    }
}
