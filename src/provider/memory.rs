use super::StorageProvider;
use crate::error::{Result, StorageError};
use crate::types::ContentIdentifier;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// Content-addressed store held in memory.
///
/// Identifiers are `sha256-<hex digest>` of the payload, so identical payloads
/// always map to the same identifier regardless of the display name.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    blobs: RwLock<HashMap<ContentIdentifier, StoredBlob>>,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    name: String,
    payload: Vec<u8>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier_for(payload: &[u8]) -> ContentIdentifier {
        let digest = Sha256::digest(payload);
        ContentIdentifier(format!("sha256-{}", hex::encode(digest)))
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display name recorded by the first upload of this content.
    pub fn name_of(&self, id: &ContentIdentifier) -> Option<String> {
        self.blobs
            .read()
            .ok()
            .and_then(|b| b.get(id).map(|blob| blob.name.clone()))
    }
}

fn poisoned() -> StorageError {
    StorageError::Internal("memory store lock poisoned".to_string())
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    async fn fetch_bytes(&self, id: &ContentIdentifier) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        blobs
            .get(id)
            .map(|blob| blob.payload.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn put_bytes(&self, name: &str, payload: &[u8]) -> Result<ContentIdentifier> {
        let id = Self::identifier_for(payload);
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.entry(id.clone()).or_insert_with(|| StoredBlob {
            name: name.to_string(),
            payload: payload.to_vec(),
        });
        Ok(id)
    }
}
