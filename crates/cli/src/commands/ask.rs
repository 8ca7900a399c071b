//! `ragent ask`: run the agent once on a question.

use futures::StreamExt;
use ragent_agent::{AgentStreamEvent, render_report, render_tool_summary, spawn_agent_stream};
use ragent_core::message::Message;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(
    config_path: Option<&Path>,
    message: String,
    stream: bool,
    toolset: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!("    RAGENT_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add api_key to: {}", ragent_config::AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let toolset = toolset.unwrap_or_else(|| config.agent.toolset.clone());
    let agent = Arc::new(ragent_gateway::build_agent(&config, &toolset)?);
    let transcript = agent.seed([Message::user(message)]);

    if !stream {
        eprint!("  Thinking...");
        let outcome = agent.process(transcript).await;
        eprint!("\r              \r");
        let outcome = outcome?;
        let tool_names = agent.tools().names();
        println!("{}", render_report(&tool_names, &outcome.transcript, &outcome.answer));
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut events = spawn_agent_stream(agent, transcript, cancel);
    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        match event {
            AgentStreamEvent::Chunk { content } => {
                print!("{content}");
                stdout.flush()?;
            }
            AgentStreamEvent::ToolCall { name, .. } => {
                tracing::debug!(tool = %name, "Tool call started");
            }
            AgentStreamEvent::ToolResult {
                name,
                arguments,
                output,
                ..
            } => {
                println!("\n\n{}\n", render_tool_summary(&name, &arguments, &output));
            }
            AgentStreamEvent::Done {
                iterations,
                tool_calls_made,
                usage,
                ..
            } => {
                println!();
                let tokens = usage.map(|u| u.total_tokens).unwrap_or_default();
                eprintln!("  [{iterations} model calls, {tool_calls_made} tool calls, {tokens} tokens]");
            }
            AgentStreamEvent::Error { message } => {
                println!();
                return Err(message.into());
            }
        }
    }
    Ok(())
}
