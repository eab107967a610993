//! Reconciliation use case - polls providers for work started by the pipeline
//!
//! Social posts and short videos finish asynchronously on the provider side.
//! A sweep asks the providers about every row still in flight, persists what
//! changed, and triggers finalization (schema + embed) or a re-embed when a
//! change makes one due.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::model::{
    ContentItem, ItemFilter, ItemPatch, PostOwner, SocialPost, SocialPostStatus, Video, VideoKind,
    VideoStatus,
};
use crate::ports::{ClientServices, Clock, ContentStore, SocialStatus, StoreError, VideoJobStatus};
use crate::usecases::pipeline::{FollowUp, Pipeline, PipelineError};
use crate::usecases::stages::latest_short_video;

/// Polling cadence for the watch loop
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Delay between sweeps while rows are still in flight
    pub active_interval: Duration,
    /// Delay between sweeps when nothing is pending
    pub idle_interval: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            active_interval: Duration::from_secs(480),
            idle_interval: Duration::from_secs(21_600),
        }
    }
}

/// One row the sweep could not reconcile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepFailure {
    /// e.g. `social:client:facebook` or `video:short`
    pub target: String,
    pub item_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub social_checked: usize,
    pub social_updated: usize,
    pub videos_checked: usize,
    pub videos_updated: usize,
    /// Items whose schema + embed ran during this sweep
    pub finalized: Vec<Uuid>,
    /// Finalized items whose post was re-composed with new media
    pub reembedded: Vec<Uuid>,
    pub errors: Vec<SweepFailure>,
    /// Rows still waiting on a provider after the sweep
    pub in_flight: usize,
}

impl SweepReport {
    fn merge_follow_up(&mut self, item_id: Uuid, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Finalized(_) => self.finalized.push(item_id),
            FollowUp::Reembedded(_) => self.reembedded.push(item_id),
            FollowUp::Nothing => {}
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Reconciler over a shared pipeline
pub struct Reconciler<St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    pipeline: Arc<Pipeline<St, Sv, Cl>>,
    config: ReconcileConfig,
}

impl<St, Sv, Cl> Reconciler<St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(pipeline: Arc<Pipeline<St, Sv, Cl>>, config: ReconcileConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Delay before the next sweep given how the last one went
    pub fn next_delay(&self, report: &SweepReport) -> Duration {
        if report.in_flight > 0 {
            self.config.active_interval
        } else {
            self.config.idle_interval
        }
    }

    /// Check every in-flight row across all items, then follow up on every
    /// item still waiting for schema + embed
    pub async fn sweep(&self) -> Result<SweepReport, ReconcileError> {
        let store = self.pipeline.store();
        let posts = store.list_processing_social_posts().await?;
        let videos = store.list_processing_videos().await?;
        let unfinished: Vec<Uuid> = store
            .list_items(&ItemFilter::default())
            .await?
            .into_iter()
            .filter(awaiting_finalization)
            .map(|item| item.id)
            .collect();

        tracing::info!(
            social = posts.len(),
            videos = videos.len(),
            unfinished = unfinished.len(),
            "Starting reconciliation sweep"
        );

        let mut report = SweepReport::default();
        self.reconcile(posts, videos, unfinished, &mut report).await?;
        report.in_flight = store.list_processing_social_posts().await?.len()
            + store.list_processing_videos().await?.len();

        tracing::info!(
            social_updated = report.social_updated,
            videos_updated = report.videos_updated,
            finalized = report.finalized.len(),
            reembedded = report.reembedded.len(),
            errors = report.errors.len(),
            in_flight = report.in_flight,
            "Reconciliation sweep finished"
        );
        Ok(report)
    }

    /// Check the in-flight rows of a single item
    pub async fn refresh_item(&self, item_id: Uuid) -> Result<SweepReport, ReconcileError> {
        let store = self.pipeline.store();
        if store.get_item(item_id).await?.is_none() {
            return Err(PipelineError::NotFound(item_id).into());
        }
        let posts = in_flight_posts(store.list_social_posts(item_id).await?);
        let videos = in_flight_videos(store.list_videos(item_id).await?);

        let mut report = SweepReport::default();
        self.reconcile(posts, videos, Vec::new(), &mut report).await?;

        // A refresh also picks up media that landed without a tracked row
        if !report.finalized.contains(&item_id) && !report.reembedded.contains(&item_id) {
            match self.pipeline.follow_up(item_id).await {
                Ok(follow_up) => report.merge_follow_up(item_id, follow_up),
                Err(e) => report.errors.push(SweepFailure {
                    target: "finalize".to_string(),
                    item_id,
                    message: e.to_string(),
                }),
            }
        }

        report.in_flight = in_flight_posts(store.list_social_posts(item_id).await?).len()
            + in_flight_videos(store.list_videos(item_id).await?).len();
        Ok(report)
    }

    /// Reconcile the rows, then follow up on every touched or unfinished
    /// item. A store error stops the row scan but the follow-ups for what
    /// was already saved still run before the error is returned.
    async fn reconcile(
        &self,
        posts: Vec<SocialPost>,
        videos: Vec<Video>,
        unfinished: Vec<Uuid>,
        report: &mut SweepReport,
    ) -> Result<(), ReconcileError> {
        let mut touched: BTreeSet<Uuid> = unfinished.into_iter().collect();
        let mut aborted: Option<StoreError> = None;

        for post in posts {
            report.social_checked += 1;
            let item_id = post.item_id;
            let target = format!("social:{}", post.ref_key());
            match self.reconcile_post(post).await {
                Ok(true) => {
                    report.social_updated += 1;
                    touched.insert(item_id);
                }
                Ok(false) => {}
                Err(Failure::Store(e)) => {
                    aborted = Some(e);
                    break;
                }
                Err(Failure::Other(message)) => {
                    tracing::warn!(item_id = %item_id, target = %target, error = %message, "Failed to reconcile social post");
                    report.errors.push(SweepFailure {
                        target,
                        item_id,
                        message,
                    });
                }
            }
        }

        for video in videos {
            if aborted.is_some() {
                break;
            }
            report.videos_checked += 1;
            let item_id = video.item_id;
            let target = format!("video:{}", video.kind.as_str());
            match self.reconcile_video(video).await {
                Ok(true) => {
                    report.videos_updated += 1;
                    touched.insert(item_id);
                }
                Ok(false) => {}
                Err(Failure::Store(e)) => {
                    aborted = Some(e);
                    break;
                }
                Err(Failure::Other(message)) => {
                    tracing::warn!(item_id = %item_id, target = %target, error = %message, "Failed to reconcile video");
                    report.errors.push(SweepFailure {
                        target,
                        item_id,
                        message,
                    });
                }
            }
        }

        for item_id in touched {
            if let Err(e) = self.resume_ready_short_video(item_id).await {
                if aborted.is_none() {
                    aborted = Some(e);
                }
                break;
            }
            match self.pipeline.follow_up(item_id).await {
                Ok(follow_up) => report.merge_follow_up(item_id, follow_up),
                Err(PipelineError::NotFound(_)) => {}
                Err(PipelineError::Store(e)) => {
                    if aborted.is_none() {
                        aborted = Some(e);
                    }
                    break;
                }
                Err(e) => {
                    tracing::warn!(item_id = %item_id, error = %e, "Follow-up after reconciliation failed");
                    report.errors.push(SweepFailure {
                        target: "finalize".to_string(),
                        item_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        match aborted {
            Some(e) => {
                tracing::error!(error = %e, "Reconciliation sweep aborted on a store error");
                Err(e.into())
            }
            None => Ok(()),
        }
    }

    /// A short video saved as ready whose item flag never landed, as after a
    /// restart between the two writes, gets the flag and its distribution.
    async fn resume_ready_short_video(&self, item_id: Uuid) -> Result<(), StoreError> {
        let store = self.pipeline.store();
        let Some(item) = store.get_item(item_id).await? else {
            return Ok(());
        };
        if item.flags.short_video_generated {
            return Ok(());
        }
        let videos = store.list_videos(item_id).await?;
        if !latest_short_video(&videos).is_some_and(|v| v.status == VideoStatus::Ready) {
            return Ok(());
        }

        match store
            .update_item(
                item_id,
                &ItemPatch {
                    short_video_generated: Some(true),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        }
        tracing::info!(item_id = %item_id, "Resumed ready short video");
        match self.pipeline.distribute_short_video(item_id).await {
            Ok(distributed) => {
                tracing::info!(item_id = %item_id, outcome = ?distributed.outcome, "Distributed short video");
            }
            Err(e) => {
                tracing::warn!(item_id = %item_id, error = %e, "Failed to distribute short video");
            }
        }
        Ok(())
    }

    /// Returns whether the row changed
    async fn reconcile_post(&self, mut post: SocialPost) -> Result<bool, Failure> {
        let store = self.pipeline.store();
        let Some(item) = store.get_item(post.item_id).await? else {
            tracing::debug!(item_id = %post.item_id, "Skipping post of deleted item");
            return Ok(false);
        };
        let Some(provider_id) = post.provider_post_id.clone() else {
            return Ok(false);
        };
        let scheduler = match post.owner {
            PostOwner::Client => self.pipeline.services().social(&item.client_id),
            PostOwner::Directory => self.pipeline.services().directory_social(),
        };
        let Some(scheduler) = scheduler else {
            return Err(Failure::Other("social scheduler is not configured".to_string()));
        };

        let now = self.pipeline.clock.now();
        match scheduler
            .check_status(&provider_id)
            .await
            .map_err(|e| Failure::Other(e.to_string()))?
        {
            SocialStatus::Pending => return Ok(false),
            SocialStatus::Published { url } => {
                post.mark_published(&url, now)
                    .map_err(|e| Failure::Other(e.to_string()))?;
                tracing::info!(item_id = %item.id, platform = %post.platform, url = %url, "Social post published");
            }
            SocialStatus::Failed { error } => {
                post.mark_failed(&error, now)
                    .map_err(|e| Failure::Other(e.to_string()))?;
                tracing::warn!(item_id = %item.id, platform = %post.platform, error = %error, "Social post failed");
            }
        }
        store.save_social_post(&post).await?;
        Ok(true)
    }

    async fn reconcile_video(&self, mut video: Video) -> Result<bool, Failure> {
        let store = self.pipeline.store();
        let Some(item) = store.get_item(video.item_id).await? else {
            tracing::debug!(item_id = %video.item_id, "Skipping video of deleted item");
            return Ok(false);
        };
        let Some(job_id) = video.provider_job_id.clone() else {
            return Ok(false);
        };
        let Some(provider) = self.pipeline.services().video(&item.client_id) else {
            return Err(Failure::Other("video provider is not configured".to_string()));
        };

        let now = self.pipeline.clock.now();
        match provider
            .check_status(&job_id)
            .await
            .map_err(|e| Failure::Other(e.to_string()))?
        {
            VideoJobStatus::Processing => Ok(false),
            VideoJobStatus::Completed {
                video_url,
                thumbnail_url,
                duration_secs,
            } => {
                video
                    .mark_ready(&video_url, thumbnail_url, duration_secs, now)
                    .map_err(|e| Failure::Other(e.to_string()))?;
                store.save_video(&video).await?;
                if video.kind == VideoKind::Short {
                    store
                        .update_item(
                            item.id,
                            &ItemPatch {
                                short_video_generated: Some(true),
                                ..Default::default()
                            },
                        )
                        .await?;
                    tracing::info!(item_id = %item.id, job_id = %job_id, "Short video ready");

                    // The row is already saved as ready, so a distribution
                    // problem must not hide the update from finalization
                    match self.pipeline.distribute_short_video(item.id).await {
                        Ok(distributed) => {
                            tracing::info!(item_id = %item.id, outcome = ?distributed.outcome, "Distributed short video");
                        }
                        Err(e) => {
                            tracing::warn!(item_id = %item.id, error = %e, "Failed to distribute short video");
                        }
                    }
                }
                Ok(true)
            }
            VideoJobStatus::Failed { error } => {
                video
                    .mark_failed(&error, now)
                    .map_err(|e| Failure::Other(e.to_string()))?;
                store.save_video(&video).await?;
                tracing::warn!(item_id = %item.id, job_id = %job_id, error = %error, "Video job failed");
                Ok(true)
            }
        }
    }
}

/// Failure while reconciling one row: store errors abort the sweep,
/// anything else is reported and the sweep moves on.
enum Failure {
    Store(StoreError),
    Other(String),
}

impl From<StoreError> for Failure {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(message) => Self::Other(format!("not found: {}", message)),
            other => Self::Store(other),
        }
    }
}

/// Blog is out but schema + embed have not both landed
fn awaiting_finalization(item: &ContentItem) -> bool {
    item.flags.blog_generated
        && (!item.flags.schema_generated
            || (item.blog_published() && item.embeds.last_embedded_at.is_none()))
}

fn in_flight_posts(posts: Vec<SocialPost>) -> Vec<SocialPost> {
    posts
        .into_iter()
        .filter(|p| {
            p.status == SocialPostStatus::Processing && p.provider_post_id.is_some()
        })
        .collect()
}

fn in_flight_videos(videos: Vec<Video>) -> Vec<Video> {
    videos
        .into_iter()
        .filter(|v| v.status == VideoStatus::Processing && v.provider_job_id.is_some())
        .collect()
}
