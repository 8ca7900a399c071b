pub mod ask;
pub mod index;
pub mod init;
pub mod serve;
pub mod tools;

use ragent_config::AppConfig;
use std::path::Path;

/// Load config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
