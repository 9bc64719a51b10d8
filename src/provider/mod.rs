//! The storage capability set shared by every backend.
//!
//! [`GatewayClient`](crate::GatewayClient) talks HTTP to a gateway and an
//! upload API. [`MemoryProvider`] implements the same trait, so callers and
//! the [`BatchCoordinator`](crate::BatchCoordinator) stay transport-agnostic.

pub mod memory;

pub use memory::MemoryProvider;

use crate::error::{Result, StorageError};
use crate::types::ContentIdentifier;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Raw payload stored under `id`.
    async fn fetch_bytes(&self, id: &ContentIdentifier) -> Result<Vec<u8>>;

    /// Upload `payload` under an advisory display name and return the
    /// identifier the network assigned.
    async fn put_bytes(&self, name: &str, payload: &[u8]) -> Result<ContentIdentifier>;

    /// Fetch and parse as JSON. Parse failures are reported as
    /// [`StorageError::Parse`], never as network errors.
    async fn fetch_json(&self, id: &ContentIdentifier) -> Result<serde_json::Value> {
        let bytes = self.fetch_bytes(id).await?;
        parse_json(id, &bytes)
    }

    /// Fetch and write to `path` atomically, creating parent directories.
    async fn save_to_path(&self, id: &ContentIdentifier, path: &Path) -> Result<PathBuf> {
        let bytes = self.fetch_bytes(id).await?;
        crate::utils::write_atomic_async(path.to_path_buf(), bytes).await
    }

    async fn put_json(&self, value: &serde_json::Value, name: &str) -> Result<ContentIdentifier> {
        let payload = serde_json::to_vec(value)?;
        self.put_bytes(name, &payload).await
    }
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    id: &ContentIdentifier,
    bytes: &[u8],
) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::error!("Error parsing JSON from {}: {}", id, e);
        StorageError::Parse(format!("{} is not valid JSON: {}", id, e))
    })
}
