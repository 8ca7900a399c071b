//! Renders retrieved fragments into the text handed back to the model.

use crate::backend::Document;

/// Format documents as numbered `Document[n]` blocks.
pub fn build_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "Documents:\n(no matching documents)\n".to_string();
    }
    let mut out = String::from("Documents:\n");
    for (i, doc) in documents.iter().enumerate() {
        out.push_str(&format!("Document[{}]\n{}\n\n", i + 1, doc.content.trim()));
    }
    out
}
