//! Config command handlers

use anyhow::{Context, Result};

use docscan_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "database_name": config.database_name,
                    "database_path": config.database_path(),
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.database_path().display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:      {}", config.data_dir.display());
            println!("  database_name: {}", config.database_name);
            println!(
                "  log_level:     {}",
                config.log_level.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("Database:    {}", config.database_path().display());
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value in the config file
///
/// Starts from the file alone so `DOCSCAN_*` overrides are not persisted.
pub fn set(key: &str, value: &str, output: &Output) -> Result<()> {
    let path = Config::config_file_path();
    let mut config = Config::from_file(&path).context("Failed to load configuration")?;
    config.set(key, value)?;
    config
        .save_to_path(&path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value), None);
    Ok(())
}
