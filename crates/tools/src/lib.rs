//! Built-in tools for the ragent agent.
//!
//! Two toolsets are available:
//! - `rag`: query rephrasing and knowledge base search
//! - `car_simulation`: spawn and delete cars in a toy simulation
//!
//! Registries are assembled explicitly; registration validates each tool's
//! schema, so a malformed tool fails at startup.

pub mod car_simulation;
pub mod rephrase_query;
pub mod search_internal_knowledge;

use ragent_core::error::ToolError;
use ragent_core::tool::ToolRegistry;
use ragent_retrieval::RetrievalBackend;
use std::sync::Arc;

pub use car_simulation::{DeleteCarTool, SpawnCarTool};
pub use rephrase_query::RephraseQueryTool;
pub use search_internal_knowledge::SearchInternalKnowledgeTool;

/// Rephrase + search, wired to the given backend.
pub fn rag_registry(backend: Arc<dyn RetrievalBackend>, default_top_k: usize) -> Result<ToolRegistry, ToolError> {
    ToolRegistry::new()
        .with(RephraseQueryTool)?
        .with(SearchInternalKnowledgeTool::new(backend, default_top_k))
}

/// The car simulation toolset.
pub fn car_simulation_registry() -> Result<ToolRegistry, ToolError> {
    ToolRegistry::new().with(SpawnCarTool)?.with(DeleteCarTool)
}

/// Build the registry for a named toolset.
pub fn registry_for_toolset(
    toolset: &str,
    backend: Arc<dyn RetrievalBackend>,
    default_top_k: usize,
) -> Result<ToolRegistry, ToolError> {
    match toolset {
        "rag" => rag_registry(backend, default_top_k),
        "car_simulation" => car_simulation_registry(),
        other => Err(ToolError::NotFound(format!("toolset '{other}'"))),
    }
}
