//! Video command - long-form uploads

use anyhow::{Context, Result};
use paa_pipeline_domain::VideoMetadata;
use std::path::PathBuf;

use crate::args::{VideoArgs, VideoCommands};
use crate::commands::item::print_stage;
use crate::context::AppContext;

pub async fn execute(args: VideoArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        VideoCommands::Upload {
            item,
            file,
            title,
            description,
            tags,
            privacy,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read video file: {}", file.display()))?;
            if bytes.is_empty() {
                anyhow::bail!("Video file is empty: {}", file.display());
            }

            let context = AppContext::load(config_path.as_deref()).await?;
            let metadata = VideoMetadata {
                title,
                description,
                tags,
                privacy,
            };
            let report = context
                .pipeline
                .upload_long_video(item, bytes, metadata)
                .await?;
            print_stage(&report, false)
        }
    }
}
