//! `ragent init`: write a default config file.

use ragent_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path);

    if path.exists() {
        println!("Config already exists at: {}", path.display());
        println!("Edit it manually or delete it and re-run `ragent init`.");
        return Ok(());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("Created config at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set api_key in the file, or export OPENAI_API_KEY");
    println!("  2. Point [retrieval] at your OpenSearch cluster, or set backend = \"keyword\"");
    println!("  3. Run: ragent index ./docs && ragent serve");
    Ok(())
}
