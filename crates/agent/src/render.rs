//! Markdown report of the tools an agent run used.
//!
//! The report starts with a Mermaid decision graph (executed tools solid,
//! unused tools dashed and greyed out), then one blockquote per executed
//! call, then the answer.

use ragent_core::message::Transcript;
use serde_json::Value;

const GREYED_OUT_CLASS: &str = "    classDef greyedOut fill:#d3d3d3,stroke:#a9a9a9,color:#696969;";

/// Render the final output for a finished run.
///
/// Returns the answer unchanged when no tool was executed.
pub fn render_report(tool_names: &[&str], transcript: &Transcript, answer: &str) -> String {
    let results: Vec<_> = transcript.tool_results().collect();
    if results.is_empty() {
        return answer.to_string();
    }

    let executed: Vec<&str> = results.iter().map(|r| r.call.name.as_str()).collect();

    let mut graph = vec![
        "```mermaid".to_string(),
        "graph TD;".to_string(),
        "    B([Decision]);".to_string(),
    ];
    for (i, name) in tool_names.iter().enumerate() {
        let node = i + 1;
        if executed.contains(name) {
            graph.push(format!("    B --> T{node}([{name}]);"));
        } else {
            graph.push(format!("    B -.-> T{node}([{name}]):::greyedOut;"));
        }
    }
    graph.push(String::new());
    graph.push("    %% Define the class for greyed-out nodes".to_string());
    graph.push(GREYED_OUT_CLASS.to_string());
    graph.push("```".to_string());

    let blocks: Vec<String> = results
        .iter()
        .map(|r| render_tool_summary(&r.call.name, &r.call.arguments, &r.output_text()))
        .collect();

    format!("{}\n\n{}\n\n---\n{}", graph.join("\n"), blocks.join("\n\n"), answer)
}

/// Render one tool call as a Markdown blockquote with a parameter table.
pub fn render_tool_summary(name: &str, arguments: &Value, output: &str) -> String {
    let mut lines = vec![
        format!("> **`{name}`**"),
        ">".to_string(),
        "> |        |               |".to_string(),
        "> |--------|---------------|".to_string(),
    ];

    if let Value::Object(map) = arguments {
        for (param, value) in map {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("> | {} | **{}** |", capitalize(param), value));
        }
    }

    lines.push(">".to_string());
    if output.is_empty() {
        lines.push("> ".to_string());
    } else {
        lines.extend(output.lines().map(|line| format!("> {line}")));
    }
    lines.join("\n")
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
