//! Document retrieval for ragent.
//!
//! The search tool talks to a [`RetrievalBackend`]: either an OpenSearch
//! cluster queried with BM25, or the offline keyword stub. The indexing
//! pipeline feeds a [`DocumentStore`] from a directory of text files.

pub mod backend;
pub mod error;
pub mod indexing;
pub mod keyword;
pub mod opensearch;
pub mod prompt;

use std::sync::Arc;

pub use backend::{Document, DocumentStore, RetrievalBackend};
pub use error::RetrievalError;
pub use indexing::{IndexReport, IndexingPipeline, WordSplitter, clean_text};
pub use keyword::KeywordBackend;
pub use opensearch::OpenSearchBackend;
pub use prompt::build_context;

/// Build the retrieval backend named in configuration.
pub fn backend_from_config(
    config: &ragent_config::RetrievalConfig,
) -> Result<Arc<dyn RetrievalBackend>, RetrievalError> {
    match config.backend.as_str() {
        "keyword" => Ok(Arc::new(KeywordBackend)),
        "opensearch" => Ok(Arc::new(OpenSearchBackend::from_config(config)?)),
        other => Err(RetrievalError::Config(format!("unknown retrieval backend '{other}'"))),
    }
}
