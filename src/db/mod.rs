//! Access to the remote vector database.
//!
//! [`VectorStore`] is the capability the viewer is handed: everything above this
//! module talks to it and never to HTTP directly. [`ChromaClient`] is the
//! implementation backed by Chroma's REST API.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

pub mod error;
pub mod http;

pub use error::{Result, StoreError};
pub use http::ChromaClient;

/// Free-form metadata attached to collections and records.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Where and as whom to connect.
#[derive(Clone)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A collection as returned by the service. Fetched per operation, never cached.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollectionHandle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Records sampled from a collection.
///
/// Each sequence may be missing or of a different length than the others; callers
/// must not assume they line up.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PeekResult {
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

impl PeekResult {
    pub fn has_ids(&self) -> bool {
        self.ids.as_ref().is_some_and(|ids| !ids.is_empty())
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all collections, in the order the service returns them.
    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn get_collection(&self, name: &str) -> Result<CollectionHandle>;

    /// Samples up to `limit` records. No ordering is guaranteed.
    async fn peek(&self, collection: &CollectionHandle, limit: usize) -> Result<PeekResult>;

    async fn count(&self, collection: &CollectionHandle) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_debug_hides_password() {
        let info = ConnectionInfo {
            host: "localhost".to_string(),
            port: 8000,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", info);
        assert!(rendered.contains("localhost"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_peek_result_tolerates_missing_and_null_fields() {
        let result: PeekResult = serde_json::from_str(
            r#"{"ids":["a","b"],"documents":null,"metadatas":[{"k":1},null],"embeddings":null}"#,
        )
        .unwrap();
        assert!(result.has_ids());
        assert!(result.documents.is_none());
        assert_eq!(result.metadatas.as_ref().map(Vec::len), Some(2));

        let empty: PeekResult = serde_json::from_str("{}").unwrap();
        assert!(!empty.has_ids());
    }

    #[test]
    fn test_collection_handle_without_metadata() {
        let handle: CollectionHandle =
            serde_json::from_str(r#"{"id":"c-1","name":"docs","metadata":null,"dimension":384}"#)
                .unwrap();
        assert_eq!(handle.name, "docs");
        assert!(handle.metadata.is_none());
    }
}
