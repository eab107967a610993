//! Pipeline use case - runs the content stages for one item
//!
//! Every stage checks its own completion flags first and persists its
//! progress through a narrow [`ItemPatch`] before the next stage starts, so a
//! run can be repeated at any point and only the missing work is done.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    ContentItem, ContentStatus, IssueKind, ItemFilter, ItemPatch, StageIssue, StageKind, Video,
};
use crate::policy::{self, PolicyViolation};
use crate::ports::{ClientServices, Clock, ContentStore, StoreError, VideoMetadata};
use crate::usecases::embed::{EmbedComposer, EmbedReport, resolve_long_video_url, resolve_short_video_url};
use crate::usecases::render::{RenderConfig, Renderer};
use crate::usecases::stages::{Done, StageError, latest_short_video};

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Images requested from the generator per item
    pub images_per_item: usize,
    /// Aspect ratio requested for the short video
    pub video_aspect_ratio: String,
    /// Upper bound on a long-form video upload
    pub long_video_timeout: Duration,
    /// Items processed in parallel by `run_due`
    pub max_concurrent: usize,
    pub render_config: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            images_per_item: 3,
            video_aspect_ratio: "9:16".to_string(),
            long_video_timeout: Duration::from_secs(15 * 60),
            max_concurrent: 4,
            render_config: RenderConfig::default(),
        }
    }
}

/// Why a stage did not do any work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The client has no adapter for the named service
    NotConfigured(String),
    /// Waiting on an earlier stage or on external work
    Deferred(String),
}

/// Outcome of a single stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed { detail: String },
    AlreadyDone,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    #[serde(flatten)]
    pub outcome: StageOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedReport>,
}

impl StageReport {
    fn skipped(stage: StageKind, reason: SkipReason) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Skipped { reason },
            embed: None,
        }
    }
}

/// Result of a pipeline run (or of finalization)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub item_id: Uuid,
    pub status: ContentStatus,
    pub needs_attention: bool,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn stage(&self, stage: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Errors that escape the pipeline. Adapter failures do not: they are
/// recorded on the item and reported as stage outcomes.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Content item not found: {0}")]
    NotFound(Uuid),
    #[error("Unknown client: {0}")]
    UnknownClient(String),
    #[error("Precondition failed: {0}")]
    Precondition(String),
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("{stage} stage failed: {message}")]
    StageFailed { stage: StageKind, message: String },
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened after a media change was observed
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    Nothing,
    Finalized(PipelineReport),
    Reembedded(EmbedReport),
}

/// Pipeline orchestrator
pub struct Pipeline<St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    pub(crate) store: Arc<St>,
    pub(crate) services: Arc<Sv>,
    pub(crate) clock: Arc<Cl>,
    pub(crate) config: PipelineConfig,
    pub(crate) renderer: Renderer,
}

impl<St, Sv, Cl> Pipeline<St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, services: Arc<Sv>, clock: Arc<Cl>, config: PipelineConfig) -> Self {
        let renderer = Renderer::new(config.render_config.clone());
        Self {
            store,
            services,
            clock,
            config,
            renderer,
        }
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn services(&self) -> &Arc<Sv> {
        &self.services
    }

    /// Run every stage for one item in order
    pub async fn run(&self, item_id: Uuid) -> Result<PipelineReport, PipelineError> {
        let item = self.load(item_id).await?;
        let client = self
            .services
            .profile(&item.client_id)
            .ok_or_else(|| PipelineError::UnknownClient(item.client_id.clone()))?;

        tracing::info!(item_id = %item_id, client = %item.client_id, status = %item.status, "Running pipeline");

        if !matches!(
            item.status,
            ContentStatus::Generating | ContentStatus::Approved | ContentStatus::Published
        ) {
            self.patch_item(item_id, &ItemPatch::new().status(ContentStatus::Generating))
                .await?;
        }

        let mut stages = Vec::with_capacity(StageKind::ORDER.len());

        let blog = self.blog_stage(item_id, &client).await;
        let blog = self.record(item_id, StageKind::Blog, blog).await?;
        let blog_failed = blog.outcome.is_failed();
        stages.push(blog);

        if blog_failed {
            for stage in &StageKind::ORDER[1..] {
                stages.push(StageReport::skipped(
                    *stage,
                    SkipReason::Deferred("blog stage failed".to_string()),
                ));
            }
            return self.finish(item_id, stages).await;
        }

        let podcast = self.podcast_stage(item_id).await;
        stages.push(self.record(item_id, StageKind::Podcast, podcast).await?);

        let images = self.images_stage(item_id, &client).await;
        stages.push(self.record(item_id, StageKind::Images, images).await?);

        let social = self.social_stage(item_id, &client).await;
        stages.push(self.record(item_id, StageKind::Social, social).await?);

        let video = self.video_stage(item_id).await;
        stages.push(self.record(item_id, StageKind::Video, video).await?);

        if self.media_done(item_id).await? {
            let schema = self.schema_stage(item_id, false).await;
            stages.push(self.record(item_id, StageKind::Schema, schema).await?);

            let embed = self.embed_stage(item_id).await;
            stages.push(self.record(item_id, StageKind::Embed, embed).await?);
        } else {
            let reason = SkipReason::Deferred("waiting for video/podcast".to_string());
            stages.push(StageReport::skipped(StageKind::Schema, reason.clone()));
            stages.push(StageReport::skipped(StageKind::Embed, reason));
        }

        self.finish(item_id, stages).await
    }

    /// Run the pipeline for every scheduled item that is due, a few at a time
    pub async fn run_due(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<(Uuid, Result<PipelineReport, PipelineError>)>, PipelineError> {
        let due = self
            .store
            .list_items(&ItemFilter {
                status: Some(ContentStatus::Scheduled),
                due_before: Some(now),
                ..Default::default()
            })
            .await?;

        if due.is_empty() {
            tracing::debug!("No items due");
            return Ok(vec![]);
        }
        tracing::info!(count = due.len(), "Processing due items");

        let max_concurrent = self.config.max_concurrent.max(1);
        let mut results = Vec::with_capacity(due.len());
        let mut pending = due.into_iter().map(|item| item.id);
        let mut tasks: FuturesUnordered<
            BoxFuture<'_, (Uuid, Result<PipelineReport, PipelineError>)>,
        > = FuturesUnordered::new();

        loop {
            while tasks.len() < max_concurrent {
                let Some(id) = pending.next() else {
                    break;
                };
                tasks.push(Box::pin(async move { (id, self.run(id).await) }));
            }
            let Some(result) = tasks.next().await else {
                break;
            };
            if let Err(e) = &result.1 {
                tracing::error!(item_id = %result.0, error = %e, "Pipeline run failed");
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Schema then embed, each at most once
    pub async fn finalize(&self, item_id: Uuid) -> Result<PipelineReport, PipelineError> {
        let item = self.load(item_id).await?;
        tracing::info!(item_id = %item_id, "Finalizing item");

        let mut stages = Vec::with_capacity(2);
        let schema = if item.flags.schema_generated {
            Ok(Done::AlreadyDone)
        } else {
            self.schema_stage(item_id, false).await
        };
        stages.push(self.record(item_id, StageKind::Schema, schema).await?);

        let embed = self.embed_stage(item_id).await;
        stages.push(self.record(item_id, StageKind::Embed, embed).await?);

        self.finish(item_id, stages).await
    }

    /// Rebuild the JSON-LD document for an item even if one exists
    pub async fn generate_schema(&self, item_id: Uuid) -> Result<StageReport, PipelineError> {
        self.load(item_id).await?;
        let result = self.schema_stage(item_id, true).await;
        let report = self.record(item_id, StageKind::Schema, result).await?;
        self.settle(item_id).await?;
        Ok(report)
    }

    /// Compose every available media fragment into the published post
    pub async fn embed_all_media(&self, item_id: Uuid) -> Result<EmbedReport, PipelineError> {
        let item = self.load(item_id).await?;
        if self.services.blog(&item.client_id).is_none() {
            return Err(PipelineError::NotConfigured("WordPress".to_string()));
        }
        if !item.blog_published() {
            return Err(PipelineError::Precondition(
                "blog post has not been published yet".to_string(),
            ));
        }

        let result = self
            .composer()
            .compose(&item)
            .await
            .map(Done::Embedded)
            .map_err(StageError::from);
        let report = self.record(item_id, StageKind::Embed, result).await?;
        self.settle(item_id).await?;

        match report {
            StageReport {
                embed: Some(embed), ..
            } => Ok(embed),
            StageReport {
                outcome:
                    StageOutcome::Skipped {
                        reason: SkipReason::NotConfigured(service),
                    },
                ..
            } => Err(PipelineError::NotConfigured(service)),
            StageReport {
                outcome:
                    StageOutcome::Skipped {
                        reason: SkipReason::Deferred(reason),
                    },
                ..
            } => Err(PipelineError::Precondition(reason)),
            StageReport { outcome, .. } => Err(PipelineError::StageFailed {
                stage: StageKind::Embed,
                message: match outcome {
                    StageOutcome::Failed { error } => error,
                    _ => "embed did not run".to_string(),
                },
            }),
        }
    }

    /// The podcast stage alone, followed by any embed it unlocks
    pub async fn publish_podcast(&self, item_id: Uuid) -> Result<StageReport, PipelineError> {
        self.load(item_id).await?;
        let result = self.podcast_stage(item_id).await;
        let report = self.record(item_id, StageKind::Podcast, result).await?;
        if !report.outcome.is_failed() {
            self.follow_up(item_id).await?;
        }
        self.settle(item_id).await?;
        Ok(report)
    }

    /// Schedule the ready short video on the video-only platforms
    pub async fn distribute_short_video(
        &self,
        item_id: Uuid,
    ) -> Result<StageReport, PipelineError> {
        let item = self.load(item_id).await?;
        let client = self
            .services
            .profile(&item.client_id)
            .ok_or_else(|| PipelineError::UnknownClient(item.client_id.clone()))?;
        let result = self.distribute_stage(item_id, &client).await;
        self.record(item_id, StageKind::Social, result).await
    }

    /// Upload a long-form video and embed it if the post is already finalized
    pub async fn upload_long_video(
        &self,
        item_id: Uuid,
        bytes: Vec<u8>,
        metadata: VideoMetadata,
    ) -> Result<StageReport, PipelineError> {
        let item = self.load(item_id).await?;
        let provider = self
            .services
            .video(&item.client_id)
            .ok_or_else(|| PipelineError::NotConfigured("video provider".to_string()))?;

        tracing::info!(item_id = %item_id, bytes = bytes.len(), title = %metadata.title, "Uploading long-form video");

        let result = self.long_video_stage(item_id, provider, bytes, &metadata).await;
        let report = self.record(item_id, StageKind::Video, result).await?;
        if !report.outcome.is_failed() {
            self.follow_up(item_id).await?;
        }
        self.settle(item_id).await?;
        Ok(report)
    }

    /// Remove an item that has not reached review
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), PipelineError> {
        let item = self.load(item_id).await?;
        policy::ensure_deletable(&item)?;
        if !self.store.delete_item(item_id).await? {
            return Err(PipelineError::NotFound(item_id));
        }
        tracing::info!(item_id = %item_id, status = %item.status, "Deleted content item");
        Ok(())
    }

    /// Move an item from review to approved
    pub async fn approve_item(&self, item_id: Uuid) -> Result<ContentItem, PipelineError> {
        let item = self.load(item_id).await?;
        let status = policy::approve(&item)?;
        let item = self
            .patch_item(item_id, &ItemPatch::new().status(status))
            .await?;
        tracing::info!(item_id = %item_id, "Approved content item");
        Ok(item)
    }

    /// Finalize once the media gate opens, or re-embed media that arrived
    /// after finalization.
    pub async fn follow_up(&self, item_id: Uuid) -> Result<FollowUp, PipelineError> {
        let item = self.load(item_id).await?;
        if !item.flags.blog_generated {
            return Ok(FollowUp::Nothing);
        }

        if !item.flags.schema_generated {
            if self.media_done(item_id).await? {
                return Ok(FollowUp::Finalized(self.finalize(item_id).await?));
            }
            return Ok(FollowUp::Nothing);
        }

        if !item.blog_published() || self.services.blog(&item.client_id).is_none() {
            return Ok(FollowUp::Nothing);
        }
        if item.embeds.last_embedded_at.is_none() || self.has_unembedded_media(&item).await? {
            return Ok(FollowUp::Reembedded(self.embed_all_media(item_id).await?));
        }
        Ok(FollowUp::Nothing)
    }

    pub(crate) fn composer(&self) -> EmbedComposer<'_, St, Sv, Cl> {
        EmbedComposer::new(
            self.store.as_ref(),
            self.services.as_ref(),
            self.clock.as_ref(),
            &self.renderer,
        )
    }

    pub(crate) async fn load(&self, item_id: Uuid) -> Result<ContentItem, PipelineError> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or(PipelineError::NotFound(item_id))
    }

    async fn patch_item(
        &self,
        item_id: Uuid,
        patch: &ItemPatch,
    ) -> Result<ContentItem, PipelineError> {
        match self.store.update_item(item_id, patch).await {
            Ok(item) => Ok(item),
            Err(StoreError::NotFound(_)) => Err(PipelineError::NotFound(item_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Video and podcast have both settled
    pub(crate) async fn media_done(&self, item_id: Uuid) -> Result<bool, PipelineError> {
        let item = self.load(item_id).await?;
        let videos = self.store.list_videos(item_id).await?;
        let podcast = self.store.get_podcast(item_id).await?;
        Ok(policy::media_done(
            &item,
            latest_short_video(&videos),
            podcast.as_ref(),
        ))
    }

    async fn has_unembedded_media(&self, item: &ContentItem) -> Result<bool, PipelineError> {
        let podcast_waiting = item.embeds.podcast_added_at.is_none()
            && (item.refs.podbean_player_url.is_some()
                || self
                    .store
                    .get_podcast(item.id)
                    .await?
                    .is_some_and(|p| p.player_url.is_some()));
        if podcast_waiting {
            return Ok(true);
        }

        if item.embeds.long_video_added_at.is_none() {
            let videos = self.store.list_videos(item.id).await?;
            if resolve_long_video_url(item, &videos).is_some() {
                return Ok(true);
            }
        }

        if item.embeds.short_video_added_at.is_none() {
            let posts = self.store.list_social_posts(item.id).await?;
            if resolve_short_video_url(&posts).is_some() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Persist the outcome of a stage on the item and turn it into a report
    pub(crate) async fn record(
        &self,
        item_id: Uuid,
        stage: StageKind,
        result: Result<Done, StageError>,
    ) -> Result<StageReport, PipelineError> {
        let now = self.clock.now();
        let mut embed = None;

        let (outcome, patch) = match result {
            Ok(Done::Completed(detail)) => (
                StageOutcome::Completed { detail },
                Some(ItemPatch::new().clear_issue(stage)),
            ),
            Ok(Done::Extended(detail)) => (StageOutcome::Completed { detail }, None),
            Ok(Done::AlreadyDone) => (StageOutcome::AlreadyDone, None),
            Ok(Done::Embedded(report)) => {
                let patch = match report.pending() {
                    Some(message) => ItemPatch::new().issue(
                        stage,
                        StageIssue::new(IssueKind::Pending, message, now),
                    ),
                    None => ItemPatch::new().clear_issue(stage),
                };
                let detail = report.summary();
                embed = Some(report);
                (StageOutcome::Completed { detail }, Some(patch))
            }
            Err(StageError::NotConfigured(service)) => {
                let issue = StageIssue::new(
                    IssueKind::NotConfigured,
                    format!("{} is not configured", service),
                    now,
                );
                (
                    StageOutcome::Skipped {
                        reason: SkipReason::NotConfigured(service),
                    },
                    Some(ItemPatch::new().issue(stage, issue)),
                )
            }
            Err(StageError::Deferred(reason)) => (
                StageOutcome::Skipped {
                    reason: SkipReason::Deferred(reason),
                },
                None,
            ),
            Err(StageError::Store(e)) => return Err(e.into()),
            Err(StageError::ItemGone) => return Err(PipelineError::NotFound(item_id)),
            Err(e) => {
                let error = e.to_string();
                (
                    StageOutcome::Failed {
                        error: error.clone(),
                    },
                    Some(ItemPatch::new().issue(
                        stage,
                        StageIssue::new(IssueKind::Failed, error, now),
                    )),
                )
            }
        };

        match &outcome {
            StageOutcome::Failed { error } => {
                tracing::warn!(item_id = %item_id, stage = %stage, error = %error, "Stage failed");
            }
            StageOutcome::Skipped { reason } => {
                tracing::info!(item_id = %item_id, stage = %stage, reason = ?reason, "Stage skipped");
            }
            StageOutcome::Completed { detail } => {
                tracing::info!(item_id = %item_id, stage = %stage, detail = %detail, "Stage completed");
            }
            StageOutcome::AlreadyDone => {
                tracing::debug!(item_id = %item_id, stage = %stage, "Stage already done");
            }
        }

        if let Some(patch) = patch {
            match self.store.update_item(item_id, &patch).await {
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => {
                    tracing::info!(item_id = %item_id, stage = %stage, "Item deleted mid-run; outcome not recorded");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(StageReport {
            stage,
            outcome,
            embed,
        })
    }

    async fn finish(
        &self,
        item_id: Uuid,
        stages: Vec<StageReport>,
    ) -> Result<PipelineReport, PipelineError> {
        let item = self.settle(item_id).await?;
        tracing::info!(
            item_id = %item_id,
            status = %item.status,
            needs_attention = item.needs_attention(),
            "Pipeline finished"
        );
        Ok(PipelineReport {
            item_id,
            status: item.status,
            needs_attention: item.needs_attention(),
            stages,
        })
    }

    /// Derive the item status from its flags and recorded issues
    pub(crate) async fn settle(&self, item_id: Uuid) -> Result<ContentItem, PipelineError> {
        let item = self.load(item_id).await?;
        let target = settled_status(&item);
        if target == item.status {
            return Ok(item);
        }
        self.patch_item(item_id, &ItemPatch::new().status(target))
            .await
    }

    /// Latest short video row for the item, if any
    pub(crate) async fn short_video(
        &self,
        item_id: Uuid,
    ) -> Result<Option<Video>, StoreError> {
        let videos = self.store.list_videos(item_id).await?;
        Ok(latest_short_video(&videos).cloned())
    }
}

/// Status an item should be in given what has been done to it.
///
/// `Approved` only moves forward to `Published`, and `Published` stays put.
pub(crate) fn settled_status(item: &ContentItem) -> ContentStatus {
    let blog_failed = item
        .issues
        .get(&StageKind::Blog)
        .is_some_and(|i| i.kind == IssueKind::Failed);
    let finalized = item.flags.schema_generated
        && (item.embeds.last_embedded_at.is_some() || !item.blog_published());

    let target = if blog_failed {
        ContentStatus::Failed
    } else if !finalized {
        ContentStatus::Generating
    } else if item.blog_published() && !item.needs_attention() {
        ContentStatus::Published
    } else {
        ContentStatus::Review
    };

    match item.status {
        ContentStatus::Published => ContentStatus::Published,
        // Not started yet
        ContentStatus::Draft | ContentStatus::Scheduled if target == ContentStatus::Generating => {
            item.status
        }
        ContentStatus::Approved if target != ContentStatus::Published => ContentStatus::Approved,
        _ => target,
    }
}
