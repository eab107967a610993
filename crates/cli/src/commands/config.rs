//! Config command - write an example file or show the effective configuration

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::commands::print_json;
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(&path, force).await,
        ConfigCommands::Show { json } => {
            let config = AppConfig::load(config_path.as_deref())?;
            if json {
                print_json(&config)
            } else {
                print!(
                    "{}",
                    toml::to_string_pretty(&config).context("Failed to render configuration")?
                );
                Ok(())
            }
        }
    }
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, AppConfig::example_toml())
        .await
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Describe your clients and the services each one uses");
    println!("  2. Export the environment variables named by each *_env setting");
    println!("  3. Run 'paa-pipeline doctor' to validate your setup");
    println!("  4. Run 'paa-pipeline schedule generate --client <id>' to fill the calendar");

    Ok(())
}
