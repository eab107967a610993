//! Schedule command - fill the publishing calendar for a client

use anyhow::{Context, Result};
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::args::{ScheduleArgs, ScheduleCommands};
use crate::commands::print_json;
use crate::context::AppContext;

pub async fn execute(args: ScheduleArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        ScheduleCommands::Generate {
            client,
            start,
            json,
        } => generate(&client, start.as_deref(), json, config_path).await,
    }
}

async fn generate(
    client_id: &str,
    start: Option<&str>,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;
    let client = context
        .config
        .client(client_id)
        .with_context(|| format!("Unknown client: {}", client_id))?;

    let start_date = match start {
        Some(s) => parse_date(s)?,
        None => OffsetDateTime::now_utc().date(),
    };

    let report = context
        .scheduler
        .generate(&client.profile, start_date)
        .await?;

    if json {
        return print_json(&report);
    }

    println!(
        "Scheduled {} item(s) for {}, {} already existed",
        report.created.len(),
        client_id,
        report.skipped_existing
    );
    for item in &report.created {
        println!(
            "  {}  {}  {} ({})",
            item.id,
            item.scheduled_at.date(),
            item.paa_question,
            item.location.label()
        );
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", s))
}
