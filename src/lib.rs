//! # signvault
//!
//! Client for content-addressed storage networks reached through an HTTP
//! gateway (reads) and an upload API (writes), as used by the ASL lesson
//! backend to store training media and lesson documents.
//!
//! One [`GatewayClient`] owns a fixed-window [`RateLimiter`], a
//! [`ConcurrencyGate`] and a [`RetryPolicy`]. Every request is admitted by the
//! limiter, holds a gate permit, and is retried with exponential backoff on
//! transient failures (429, 5xx, transport errors, timeouts).
//!
//! ```rust,no_run
//! use signvault::{ClientConfig, GatewayClient};
//! use serde_json::json;
//!
//! # async fn run() -> signvault::Result<()> {
//! let client = GatewayClient::new(ClientConfig::default().with_token("token"))?;
//!
//! let id = client.put_json(&json!({"lesson": "alphabet"}), "lesson.json").await?;
//! let _lesson = client.fetch_json(&id).await?;
//!
//! let ids = signvault::parse_identifiers(&["bafy...a", "bafy...b"])?;
//! let _outcomes = client.retrieve_batch(&ids, Some(std::path::Path::new("media"))).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Dependencies | Use case |
//! |---------|-------------|----------|
//! | `axum-support` | axum | [`StorageError`] implements `IntoResponse` |

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod types;
pub mod utils;

pub use client::{
    parse_identifiers, BatchCoordinator, ConcurrencyGate, GatewayClient, RateLimiter, RetryPolicy,
};
pub use config::ClientConfig;
pub use error::{Result, StorageError};
pub use provider::{MemoryProvider, StorageProvider};
pub use types::{BatchOutcomes, BatchReport, ContentIdentifier, RetrievalOutcome};
