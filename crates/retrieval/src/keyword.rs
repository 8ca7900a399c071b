//! Offline keyword backend.
//!
//! Answers a handful of known topics with fixed facts so the agent can be
//! exercised end to end without a search cluster.

use async_trait::async_trait;
use crate::backend::{Document, RetrievalBackend};
use crate::error::RetrievalError;

/// Case-insensitive topic → fact table, checked in order.
const FACTS: &[(&str, &str)] = &[
    ("germany", "Germany has 10 million inhabitants."),
    ("france", "France has 5 million inhabitants."),
    ("mac", "the computer has 16gb of ram"),
];

const FALLBACK: &str = "64 Million residents";

pub struct KeywordBackend;

impl KeywordBackend {
    /// The fact for a query, or the fallback answer.
    pub fn lookup(query: &str) -> &'static str {
        let lower = query.to_lowercase();
        FACTS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, fact)| *fact)
            .unwrap_or(FALLBACK)
    }
}

#[async_trait]
impl RetrievalBackend for KeywordBackend {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let mut doc = Document::new(Self::lookup(query));
        doc.score = Some(1.0);
        Ok(vec![doc])
    }
}
