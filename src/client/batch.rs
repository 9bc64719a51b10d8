use super::gateway::GatewayClient;
use crate::error::{Result, StorageError};
use crate::provider::StorageProvider;
use crate::types::{BatchOutcomes, BatchReport, ContentIdentifier, RetrievalOutcome};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Fans a list of identifiers out to concurrent retrievals and collects one
/// outcome per identifier.
///
/// A failed unit is recorded as [`RetrievalOutcome::Failure`] and never
/// cancels its siblings. Dropping the returned future aborts the units that
/// have not finished yet.
pub struct BatchCoordinator<P: StorageProvider + 'static> {
    provider: Arc<P>,
}

impl<P: StorageProvider + 'static> Clone for BatchCoordinator<P> {
    fn clone(&self) -> Self {
        BatchCoordinator {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: StorageProvider + 'static> BatchCoordinator<P> {
    pub fn new(provider: P) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    pub fn from_arc(provider: Arc<P>) -> Self {
        BatchCoordinator { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Retrieve every identifier concurrently.
    ///
    /// With `destination_dir` each payload is saved atomically to
    /// `destination_dir/<id>` and reported as `SavedTo`; otherwise the bytes
    /// are returned. Duplicate identifiers are each fetched but collapse to a
    /// single map entry. The call itself only fails when the destination
    /// directory cannot be created.
    pub async fn retrieve_batch(
        &self,
        ids: &[ContentIdentifier],
        destination_dir: Option<&Path>,
    ) -> Result<BatchOutcomes> {
        if let Some(dir) = destination_dir {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                StorageError::Io(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let mut units = JoinSet::new();
        for id in ids {
            let provider = Arc::clone(&self.provider);
            let id = id.clone();
            let dest = destination_dir.map(|dir| dir.join(id.as_str()));

            units.spawn(async move {
                let result = match dest {
                    Some(path) => provider
                        .save_to_path(&id, &path)
                        .await
                        .map(RetrievalOutcome::SavedTo),
                    None => provider
                        .fetch_bytes(&id)
                        .await
                        .map(RetrievalOutcome::Bytes),
                };
                (id, result)
            });
        }

        let mut outcomes = BatchOutcomes::with_capacity(ids.len());
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((id, Ok(outcome))) => {
                    outcomes.insert(id, outcome);
                }
                Ok((id, Err(e))) => {
                    tracing::warn!("Error processing {}: {}", id, e);
                    outcomes.insert(id, RetrievalOutcome::Failure(e));
                }
                Err(e) => {
                    // The identifier is lost with the task; filled in below.
                    tracing::error!("Batch unit task failed: {}", e);
                }
            }
        }

        for id in ids {
            outcomes.entry(id.clone()).or_insert_with(|| {
                RetrievalOutcome::Failure(StorageError::Internal(format!(
                    "retrieval task for {} did not complete",
                    id
                )))
            });
        }

        tracing::info!(
            "Batch retrieval finished: {} requested, {} succeeded, {} failed",
            ids.len(),
            outcomes.succeeded(),
            outcomes.failed()
        );
        Ok(outcomes)
    }
}

impl GatewayClient {
    /// Batch retrieval over this client's shared gates.
    pub async fn retrieve_batch(
        &self,
        ids: &[ContentIdentifier],
        destination_dir: Option<&Path>,
    ) -> Result<BatchOutcomes> {
        BatchCoordinator::new(self.clone())
            .retrieve_batch(ids, destination_dir)
            .await
    }
}

/// Validate raw identifier strings before scheduling a batch.
pub fn parse_identifiers<S: AsRef<str>>(raw: &[S]) -> Result<Vec<ContentIdentifier>> {
    raw.iter()
        .map(|s| ContentIdentifier::new(s.as_ref()))
        .collect()
}
