use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn run(path: Option<PathBuf>) -> Result<()> {
    let (service, config) = super::load_config(path)?;

    match service.config_path() {
        Some(path) if path.exists() => println!("# Loaded from {}", path.display()),
        Some(path) => println!("# {} not found, showing defaults", path.display()),
        None => println!("# No config location, showing defaults"),
    }
    let rendered = toml::to_string_pretty(&config).context("Failed to render config as TOML")?;
    println!("{rendered}");

    Ok(())
}
