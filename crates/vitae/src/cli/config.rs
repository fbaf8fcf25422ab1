use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vitae_core::ParserConfig;

const CONFIG_ENV: &str = "VITAE_CONFIG";

/// Defaults, then the config file, then `VITAE_*` variables. Command-line
/// flags are applied by each command on top of this.
pub fn load(explicit: Option<&Path>) -> Result<ParserConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(default_path);

    let config = match path {
        Some(path) => ParserConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ParserConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn default_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("vitae").join("config.json");
    path.is_file().then_some(path)
}

pub fn run(config: &ParserConfig) -> Result<()> {
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
