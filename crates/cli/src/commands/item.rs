//! Single-stage commands: embed, schema and podcast

use anyhow::Result;
use paa_pipeline_domain::usecases::{EmbedReport, StageReport};
use std::path::PathBuf;

use crate::args::ItemArg;
use crate::commands::pipeline::outcome_line;
use crate::commands::print_json;
use crate::context::AppContext;

pub async fn embed(args: ItemArg, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;
    let report = context.pipeline.embed_all_media(args.item).await?;

    if args.json {
        return print_json(&report);
    }
    print_embed(&report);
    Ok(())
}

pub async fn schema(args: ItemArg, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;
    let report = context.pipeline.generate_schema(args.item).await?;
    print_stage(&report, args.json)
}

pub async fn podcast(args: ItemArg, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;
    let report = context.pipeline.publish_podcast(args.item).await?;
    print_stage(&report, args.json)
}

pub(crate) fn print_stage(report: &StageReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!("{}: {}", report.stage, outcome_line(&report.outcome));
    if report.outcome.is_failed() {
        anyhow::bail!("{} stage failed", report.stage);
    }
    Ok(())
}

fn print_embed(report: &EmbedReport) {
    println!("{}", report.summary());
    for skipped in &report.skipped {
        println!("  - {}: {}", skipped.kind, skipped.message);
    }
    println!("digest: {}", report.digest);
}
