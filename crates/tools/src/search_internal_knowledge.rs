//! Knowledge base search tool backed by a retrieval backend.

use async_trait::async_trait;
use ragent_core::error::ToolError;
use ragent_core::tool::{ParameterKind, Tool, ToolArguments, ToolParameter};
use ragent_retrieval::{RetrievalBackend, build_context};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on fragments per search.
const MAX_TOP_K: i64 = 20;

pub struct SearchInternalKnowledgeTool {
    backend: Arc<dyn RetrievalBackend>,
    default_top_k: usize,
}

impl SearchInternalKnowledgeTool {
    pub fn new(backend: Arc<dyn RetrievalBackend>, default_top_k: usize) -> Self {
        Self {
            backend,
            default_top_k: default_top_k.clamp(1, MAX_TOP_K as usize),
        }
    }
}

#[async_trait]
impl Tool for SearchInternalKnowledgeTool {
    fn name(&self) -> &str {
        "search_internal_knowledge"
    }

    fn description(&self) -> &str {
        "Starts a retrieval system which searches internal knowledge based on similarity to the input query. Returns numbered document fragments."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required(
                "query",
                ParameterKind::String,
                "Query on which the search will be performed",
            ),
            ToolParameter::optional(
                "top_k",
                ParameterKind::Integer,
                "Number of fragments to return",
                self.default_top_k as i64,
            ),
        ]
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let query = args.str("query")?.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }
        let top_k = args.i64("top_k")?.clamp(1, MAX_TOP_K) as usize;

        debug!(backend = self.backend.name(), top_k, "Searching internal knowledge");
        let documents = self
            .backend
            .retrieve(query, top_k)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Value::String(build_context(&documents)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragent_core::tool::ToolRegistry;
    use ragent_retrieval::{Document, KeywordBackend, RetrievalError};
    use serde_json::json;
    use std::sync::Mutex;

    struct CountingBackend {
        seen_top_k: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RetrievalBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }
        async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrievalError> {
            self.seen_top_k.lock().unwrap().push(top_k);
            Ok((0..top_k).map(|i| Document::new(format!("{query} #{i}"))).collect())
        }
    }

    struct DownBackend;

    #[async_trait]
    impl RetrievalBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }
        async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Document>, RetrievalError> {
            Err(RetrievalError::Request("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn keyword_backend_answers_known_topics() {
        let registry = ToolRegistry::new()
            .with(SearchInternalKnowledgeTool::new(Arc::new(KeywordBackend), 5))
            .unwrap();
        let out = registry
            .invoke("search_internal_knowledge", &json!({"query": "population of Germany"}))
            .await
            .unwrap();
        let text = out.as_str().unwrap();
        assert!(text.contains("Document[1]"));
        assert!(text.contains("Germany has 10 million inhabitants."));
    }

    #[tokio::test]
    async fn top_k_defaults_and_clamps() {
        let backend = Arc::new(CountingBackend { seen_top_k: Mutex::new(vec![]) });
        let registry = ToolRegistry::new()
            .with(SearchInternalKnowledgeTool::new(backend.clone(), 5))
            .unwrap();

        registry.invoke("search_internal_knowledge", &json!({"query": "a"})).await.unwrap();
        registry
            .invoke("search_internal_knowledge", &json!({"query": "b", "top_k": "3"}))
            .await
            .unwrap();
        registry
            .invoke("search_internal_knowledge", &json!({"query": "c", "top_k": 500}))
            .await
            .unwrap();
        assert_eq!(*backend.seen_top_k.lock().unwrap(), vec![5, 3, 20]);
    }

    #[tokio::test]
    async fn empty_query_is_invalid() {
        let tool = SearchInternalKnowledgeTool::new(Arc::new(KeywordBackend), 5);
        let registry = ToolRegistry::new().with(tool).unwrap();
        let err = registry
            .invoke("search_internal_knowledge", &json!({"query": "   "}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn backend_failure_is_execution_failure() {
        let registry = ToolRegistry::new()
            .with(SearchInternalKnowledgeTool::new(Arc::new(DownBackend), 5))
            .unwrap();
        let err = registry
            .invoke("search_internal_knowledge", &json!({"query": "x"}))
            .await
            .unwrap_err();
        match err {
            ToolError::ExecutionFailed { tool_name, reason } => {
                assert_eq!(tool_name, "search_internal_knowledge");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
