//! `ragent serve`: start the HTTP gateway.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if !config.has_api_key() {
        tracing::warn!("No API key configured; model calls will fail until one is set");
    }

    println!("ragent gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model id:  {}", config.gateway.model_id);
    println!("   Toolset:   {}", config.agent.toolset);
    println!("   Auth:      {}", if config.gateway.api_keys.is_empty() { "off" } else { "bearer" });

    ragent_gateway::start(config).await?;

    Ok(())
}
