//! Reconcile command - poll providers once or on a loop

use anyhow::Result;
use paa_pipeline_domain::usecases::SweepReport;
use std::path::PathBuf;

use crate::args::ReconcileArgs;
use crate::commands::print_json;
use crate::context::AppContext;

pub async fn execute(args: ReconcileArgs, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;
    let reconciler = &context.reconciler;

    if !args.watch {
        let report = match args.item {
            Some(item_id) => reconciler.refresh_item(item_id).await?,
            None => reconciler.sweep().await?,
        };
        if args.json {
            print_json(&report)?;
        } else {
            print_summary(&report);
        }
        return Ok(());
    }

    tracing::info!(
        active_secs = reconciler.config().active_interval.as_secs(),
        idle_secs = reconciler.config().idle_interval.as_secs(),
        "Watching in-flight posts and videos"
    );

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };
    tokio::pin!(shutdown);

    loop {
        let delay = match reconciler.sweep().await {
            Ok(report) => {
                for failure in &report.errors {
                    tracing::warn!(
                        item_id = %failure.item_id,
                        target = %failure.target,
                        error = %failure.message,
                        "Row not reconciled"
                    );
                }
                reconciler.next_delay(&report)
            }
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation sweep failed");
                reconciler.config().active_interval
            }
        };

        tracing::debug!(next_secs = delay.as_secs(), "Sleeping until next sweep");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    Ok(())
}

fn print_summary(report: &SweepReport) {
    println!(
        "Social posts: {} checked, {} updated",
        report.social_checked, report.social_updated
    );
    println!(
        "Videos: {} checked, {} updated",
        report.videos_checked, report.videos_updated
    );
    for item_id in &report.finalized {
        println!("Finalized {}", item_id);
    }
    for item_id in &report.reembedded {
        println!("Re-embedded {}", item_id);
    }
    for failure in &report.errors {
        println!("✗ {} {}: {}", failure.item_id, failure.target, failure.message);
    }
    println!("Still in flight: {}", report.in_flight);
}
