//! `escrow config` commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{ClientConfig, Environment};

pub fn set(
    server: Option<&str>,
    environment: Option<Environment>,
    config_path: &Path,
) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;
    if let Some(server) = server {
        config.server = server.trim_end_matches('/').to_string();
    }
    if let Some(environment) = environment {
        config.environment = environment;
    }
    config.save(config_path)?;
    println!("Saved {}.", config_path.display());
    Ok(())
}

pub fn show(config_path: &Path) -> Result<()> {
    let config = ClientConfig::load_with_env(config_path)?;
    println!("config:      {}", config_path.display());
    println!(
        "server:      {}",
        if config.server.is_empty() { "(not set)" } else { config.server.as_str() }
    );
    println!("environment: {}", config.environment);
    println!("credential:  {}", config.token_path(config_path).display());
    println!("poll:        {}s", config.poll_interval_secs);
    Ok(())
}
