//! Retrieval traits and the document value type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::error::RetrievalError;

/// A text fragment stored in, or returned from, the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Content hash; writing the same content twice overwrites one entry
    pub id: String,

    pub content: String,

    /// Relevance score, present on retrieved documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// File the fragment was split from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    /// Create a document whose id is the SHA-256 of its content.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: content_id(&content),
            content,
            score: None,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Hex SHA-256 of a fragment's text.
pub fn content_id(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Given a query and a result-count bound, return relevant fragments, best first.
///
/// Shared across concurrent requests; implementations must tolerate parallel use.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrievalError>;
}

/// A backend that can also be written to by the indexing pipeline.
#[async_trait]
pub trait DocumentStore: RetrievalBackend {
    /// Create the index if it does not exist yet.
    async fn prepare(&self) -> Result<(), RetrievalError> {
        Ok(())
    }

    /// Write documents, overwriting entries with the same id. Returns the number written.
    async fn write_documents(&self, documents: &[Document]) -> Result<usize, RetrievalError>;
}
