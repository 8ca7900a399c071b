//! Query rephrasing tool.
//!
//! Placeholder for mapping a question onto internal terms and abbreviations;
//! it currently hands the question back unchanged.

use async_trait::async_trait;
use ragent_core::error::ToolError;
use ragent_core::tool::{ParameterKind, Tool, ToolArguments, ToolParameter};
use serde_json::Value;

pub struct RephraseQueryTool;

#[async_trait]
impl Tool for RephraseQueryTool {
    fn name(&self) -> &str {
        "rephrase_query"
    }

    fn description(&self) -> &str {
        "Rephrases the question based on internal abbreviations and descriptions. Apply once, to the original question only."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "original_question",
            ParameterKind::String,
            "The plain original question",
        )]
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        Ok(Value::String(args.str("original_question")?.to_string()))
    }
}
