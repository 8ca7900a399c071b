//! `ragent tools`: list the tools of a toolset.

use std::path::Path;

pub fn run(config_path: Option<&Path>, toolset: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let toolset = toolset.unwrap_or_else(|| config.agent.toolset.clone());

    let backend = ragent_retrieval::backend_from_config(&config.retrieval)?;
    let registry = ragent_tools::registry_for_toolset(&toolset, backend, config.retrieval.top_k)?;

    println!("Toolset '{toolset}' ({} tools)", registry.len());
    for definition in registry.definitions() {
        println!();
        println!("  {}", definition.name);
        println!("    {}", definition.description);
        if let Some(properties) = definition.parameters["properties"].as_object() {
            for (name, schema) in properties {
                let kind = schema["type"].as_str().unwrap_or("any");
                match schema.get("default") {
                    Some(default) => println!("    - {name}: {kind} (default {default})"),
                    None => println!("    - {name}: {kind} (required)"),
                }
            }
        }
    }
    Ok(())
}
