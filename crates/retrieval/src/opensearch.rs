//! OpenSearch document store.
//!
//! Retrieval is a BM25 `match` query on the `content` field; writes go
//! through the `_bulk` API with `index` actions keyed by content hash, so
//! re-indexing the same fragment overwrites it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::backend::{Document, DocumentStore, RetrievalBackend};
use crate::error::RetrievalError;

pub struct OpenSearchBackend {
    host: String,
    index: String,
    username: String,
    password: Option<String>,
    client: reqwest::Client,
}

impl OpenSearchBackend {
    pub fn new(
        host: impl Into<String>,
        index: impl Into<String>,
        username: impl Into<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Config(e.to_string()))?;
        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            index: index.into(),
            username: username.into(),
            password,
            client,
        })
    }

    pub fn from_config(config: &ragent_config::RetrievalConfig) -> Result<Self, RetrievalError> {
        Self::new(
            &config.host,
            &config.index,
            &config.username,
            config.password.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.host, path.trim_start_matches('/'));
        self.client
            .request(method, url)
            .basic_auth(&self.username, self.password.as_deref())
    }

    /// BM25 query body for a search.
    fn search_body(query: &str, top_k: usize) -> serde_json::Value {
        json!({
            "size": top_k,
            "query": {
                "match": {
                    "content": { "query": query }
                }
            }
        })
    }

    /// NDJSON body for a bulk write.
    fn bulk_body(index: &str, documents: &[Document]) -> String {
        let mut body = String::new();
        for doc in documents {
            let action = json!({ "index": { "_index": index, "_id": doc.id } });
            let source = json!({ "content": doc.content, "source": doc.source });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&source.to_string());
            body.push('\n');
        }
        body
    }

    fn parse_hits(response: SearchResponse) -> Vec<Document> {
        response
            .hits
            .hits
            .into_iter()
            .map(|hit| Document {
                id: hit.id,
                content: hit.source.content,
                score: hit.score,
                source: hit.source.source,
            })
            .collect()
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, RetrievalError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(RetrievalError::Status { status, body })
}

#[async_trait]
impl RetrievalBackend for OpenSearchBackend {
    fn name(&self) -> &str {
        "opensearch"
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrievalError> {
        debug!(index = %self.index, top_k, "BM25 search");
        let response = self
            .request(reqwest::Method::POST, &format!("{}/_search", self.index))
            .json(&Self::search_body(query, top_k))
            .send()
            .await?;

        // A missing index simply has no documents yet
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(index = %self.index, "Search index does not exist");
            return Ok(Vec::new());
        }

        let response = error_for_status(response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;
        Ok(Self::parse_hits(parsed))
    }
}

#[async_trait]
impl DocumentStore for OpenSearchBackend {
    async fn prepare(&self) -> Result<(), RetrievalError> {
        let exists = self.request(reqwest::Method::HEAD, &self.index).send().await?;
        if exists.status().is_success() {
            return Ok(());
        }

        info!(index = %self.index, "Creating search index");
        let mapping = json!({
            "mappings": {
                "properties": {
                    "content": { "type": "text" },
                    "source": { "type": "keyword" }
                }
            }
        });
        let response = self
            .request(reqwest::Method::PUT, &self.index)
            .json(&mapping)
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }

    async fn write_documents(&self, documents: &[Document]) -> Result<usize, RetrievalError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let response = self
            .request(reqwest::Method::POST, "_bulk?refresh=true")
            .header("Content-Type", "application/x-ndjson")
            .body(Self::bulk_body(&self.index, documents))
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let result: BulkResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;
        if result.errors {
            let reason = result
                .items
                .iter()
                .filter_map(|item| item.get("index").and_then(|i| i.get("error")))
                .map(|e| e.to_string())
                .next()
                .unwrap_or_else(|| "unknown bulk error".into());
            return Err(RetrievalError::Bulk(reason));
        }

        debug!(index = %self.index, count = documents.len(), "Bulk write complete");
        Ok(documents.len())
    }
}

// --- OpenSearch response types (internal) ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    content: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}
