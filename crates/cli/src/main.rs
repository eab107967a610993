//! paa-pipeline CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;
mod context;
mod server;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: --log-level, then RUST_LOG, then the configured level
    let directive = log_directive(
        cli.log_level.as_deref(),
        std::env::var("RUST_LOG").ok(),
        || {
            config::AppConfig::load(cli.config.as_deref())
                .map(|c| c.general.log_level)
                .unwrap_or_else(|_| "info".to_string())
        },
    );
    init_logging(&directive)?;

    // Execute command
    match cli.command {
        Commands::Pipeline(args) => commands::pipeline::execute(args, cli.config).await,
        Commands::Reconcile(args) => commands::reconcile::execute(args, cli.config).await,
        Commands::Embed(args) => commands::item::embed(args, cli.config).await,
        Commands::Schema(args) => commands::item::schema(args, cli.config).await,
        Commands::Podcast(args) => commands::item::podcast(args, cli.config).await,
        Commands::Video(args) => commands::video::execute(args, cli.config).await,
        Commands::Schedule(args) => commands::schedule::execute(args, cli.config).await,
        Commands::Items(args) => commands::items::execute(args, cli.config).await,
        Commands::Serve(args) => commands::serve::execute(args, cli.config).await,
        Commands::Config(args) => commands::config::execute(args, cli.config).await,
        Commands::Doctor(args) => commands::doctor::execute(args, cli.config).await,
    }
}

fn log_directive(
    flag: Option<&str>,
    rust_log: Option<String>,
    configured: impl FnOnce() -> String,
) -> String {
    match (flag, rust_log) {
        (Some(level), _) => level.to_string(),
        (None, Some(env)) if !env.trim().is_empty() => env,
        _ => configured(),
    }
}

fn init_logging(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_rust_log() {
        let directive = log_directive(Some("debug"), Some("warn".to_string()), || {
            unreachable!("config is not consulted")
        });
        assert_eq!(directive, "debug");
    }

    #[test]
    fn test_rust_log_overrides_config() {
        let directive = log_directive(None, Some("paa_pipeline=trace".to_string()), || {
            "error".to_string()
        });
        assert_eq!(directive, "paa_pipeline=trace");
    }

    #[test]
    fn test_config_level_is_the_fallback() {
        assert_eq!(log_directive(None, None, || "warn".to_string()), "warn");
        assert_eq!(
            log_directive(None, Some("  ".to_string()), || "info".to_string()),
            "info"
        );
    }
}
