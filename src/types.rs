use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Opaque key addressing a blob by content hash (e.g. an IPFS CID).
///
/// Only syntax is checked here. The storage network guarantees that one
/// identifier never maps to two different payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentIdentifier(pub(crate) String);

impl ContentIdentifier {
    /// Identifiers end up in URLs and as file names during batch retrieval,
    /// so empty strings, whitespace, path separators and URL delimiters
    /// (`?`, `#`, `%`) are rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(StorageError::InvalidIdentifier(
                "identifier must not be empty".to_string(),
            ));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(StorageError::InvalidIdentifier(format!(
                "identifier contains whitespace: {:?}",
                raw
            )));
        }
        if raw.contains('/') || raw.contains('\\') || raw == "." || raw == ".." {
            return Err(StorageError::InvalidIdentifier(format!(
                "identifier is not a single path segment: {:?}",
                raw
            )));
        }
        if raw.contains(['?', '#', '%']) {
            return Err(StorageError::InvalidIdentifier(format!(
                "identifier contains a URL delimiter: {:?}",
                raw
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ContentIdentifier {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentIdentifier {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ContentIdentifier {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContentIdentifier> for String {
    fn from(id: ContentIdentifier) -> Self {
        id.0
    }
}

/// Result of retrieving one identifier in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Bytes(Vec<u8>),
    SavedTo(PathBuf),
    Failure(StorageError),
}

impl RetrievalOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RetrievalOutcome::Failure(_))
    }

    pub fn error(&self) -> Option<&StorageError> {
        match self {
            RetrievalOutcome::Failure(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<RetrievalOutcome> {
        match self {
            RetrievalOutcome::Failure(e) => Err(e),
            other => Ok(other),
        }
    }
}

/// Per-identifier outcomes of one batch call.
pub type BatchOutcomes = HashMap<ContentIdentifier, RetrievalOutcome>;

/// Summary helpers over a batch result map.
pub trait BatchReport {
    fn succeeded(&self) -> usize;
    fn failed(&self) -> usize;
    fn failures(&self) -> Vec<(&ContentIdentifier, &StorageError)>;
}

impl BatchReport for BatchOutcomes {
    fn succeeded(&self) -> usize {
        self.values().filter(|o| o.is_success()).count()
    }

    fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    fn failures(&self) -> Vec<(&ContentIdentifier, &StorageError)> {
        let mut failures: Vec<_> = self
            .iter()
            .filter_map(|(id, outcome)| outcome.error().map(|e| (id, e)))
            .collect();
        failures.sort_by(|a, b| a.0.cmp(b.0));
        failures
    }
}
