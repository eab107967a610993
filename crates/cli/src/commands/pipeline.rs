//! Pipeline command - run the content stages for one item or everything due

use anyhow::Result;
use paa_pipeline_domain::usecases::{PipelineReport, SkipReason, StageOutcome};
use std::path::PathBuf;
use time::OffsetDateTime;

use crate::args::PipelineArgs;
use crate::commands::print_json;
use crate::context::AppContext;

pub async fn execute(args: PipelineArgs, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;

    let reports = if let Some(item_id) = args.item {
        vec![context.pipeline.run(item_id).await?]
    } else {
        let results = context.pipeline.run_due(OffsetDateTime::now_utc()).await?;
        tracing::info!(processed = results.len(), "Due items processed");

        let mut reports = Vec::with_capacity(results.len());
        for (item_id, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(item_id = %item_id, error = %e, "Failed"),
            }
        }
        reports
    };

    if args.json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            print_report(report);
        }
        if reports.is_empty() {
            println!("No items were due");
        }
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    let attention = if report.needs_attention {
        " (needs attention)"
    } else {
        ""
    };
    println!("{} → {}{}", report.item_id, report.status, attention);

    for stage in &report.stages {
        println!("  {:<8} {}", stage.stage.as_str(), outcome_line(&stage.outcome));
    }
}

pub(crate) fn outcome_line(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Completed { detail } => format!("✓ {}", detail),
        StageOutcome::AlreadyDone => "✓ already done".to_string(),
        StageOutcome::Skipped {
            reason: SkipReason::NotConfigured(service),
        } => format!("- {} not configured", service),
        StageOutcome::Skipped {
            reason: SkipReason::Deferred(why),
        } => format!("- deferred: {}", why),
        StageOutcome::Failed { error } => format!("✗ {}", error),
    }
}
