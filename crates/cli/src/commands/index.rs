//! `ragent index`: index a directory of documents into OpenSearch.

use std::path::Path;
use std::sync::Arc;
use ragent_retrieval::{IndexingPipeline, OpenSearchBackend, WordSplitter};

pub async fn run(config_path: Option<&Path>, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let retrieval = &config.retrieval;

    if retrieval.backend != "opensearch" {
        return Err(format!(
            "indexing needs the opensearch backend (configured: '{}')",
            retrieval.backend
        )
        .into());
    }

    let store = Arc::new(OpenSearchBackend::from_config(retrieval)?);
    let splitter = WordSplitter::new(retrieval.split_length, retrieval.split_overlap)?;

    println!("Indexing {} into {}/{}", dir.display(), retrieval.host, store.index());
    let report = IndexingPipeline::new(store, splitter).run(dir).await?;

    println!("   Files seen:        {}", report.files_seen);
    println!("   Files indexed:     {}", report.files_indexed);
    println!("   Files skipped:     {}", report.files_skipped);
    println!("   Documents written: {}", report.documents_written);
    Ok(())
}
