mod firestore;
mod memory;

pub use firestore::FirestoreClient;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid database URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("credentials file error: {0}")]
    Credentials(#[from] std::io::Error),

    #[error("malformed service account file: {0}")]
    MalformedCredentials(#[from] serde_json::Error),

    #[error("credentials are for project '{found}', expected '{expected}'")]
    ProjectMismatch { expected: String, found: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote store returned {status}: {body}")]
    UnexpectedResponse {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("store is not connected")]
    NotConnected,
}

/// Capability surface of the remote configuration store.
///
/// The manager only depends on this seam, so tests run against
/// `MemoryStore` or a mock instead of a live backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Establish the connection. Must be called before `read`/`write`.
    async fn connect(&mut self) -> Result<(), StoreError>;

    /// Fetch a document by key. `Ok(None)` means the key has no document.
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Create or replace a document under the given key.
    async fn write(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}
