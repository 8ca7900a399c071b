//! ragent CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `serve`: Start the OpenAI-compatible HTTP gateway
//! - `ask`: Run the agent once on a question
//! - `index`: Index a directory of documents into OpenSearch
//! - `tools`: List the tools of a toolset

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

mod commands;

#[derive(Parser)]
#[command(
    name = "ragent",
    about = "ragent: tool-calling RAG agent with an OpenAI-compatible API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.ragent/config.toml
    #[arg(short, long, global = true, env = "RAGENT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the agent a single question
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,

        /// Toolset to use instead of the configured one
        #[arg(long)]
        toolset: Option<String>,
    },

    /// Index text, markdown and PDF files under a directory
    Index {
        /// Directory to index
        dir: PathBuf,
    },

    /// List the tools available to the agent
    Tools {
        /// Toolset to list instead of the configured one
        #[arg(long)]
        toolset: Option<String>,
    },
}

/// Load `.env` (or `env_file`), then parse `args`.
///
/// Order matters: values from `.env` feed clap's `env` fallbacks.
fn parse_with_env<I, T>(env_file: Option<&Path>, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    // A missing .env is fine
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Cli::try_parse_from(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_with_env(None, std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config_path)?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask {
            message,
            stream,
            toolset,
        } => commands::ask::run(config_path, message, stream, toolset).await?,
        Commands::Index { dir } => commands::index::run(config_path, &dir).await?,
        Commands::Tools { toolset } => commands::tools::run(config_path, toolset)?,
    }

    Ok(())
}
