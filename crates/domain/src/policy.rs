//! Lifecycle rules enforced at the boundaries of the pipeline

use crate::model::{ContentItem, ContentStatus, Podcast, Video};

/// Violations of the content lifecycle rules
#[derive(Debug, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Item in status '{status}' cannot be deleted")]
    NotDeletable { status: ContentStatus },
    #[error("Item in status '{status}' cannot be approved (expected 'review')")]
    NotApprovable { status: ContentStatus },
}

/// Only items that never reached review may be removed.
pub fn ensure_deletable(item: &ContentItem) -> Result<(), PolicyViolation> {
    if item.status.is_deletable() {
        Ok(())
    } else {
        Err(PolicyViolation::NotDeletable {
            status: item.status,
        })
    }
}

/// Status an item moves to when a reviewer approves it
pub fn approve(item: &ContentItem) -> Result<ContentStatus, PolicyViolation> {
    match item.status {
        ContentStatus::Review => Ok(ContentStatus::Approved),
        status => Err(PolicyViolation::NotApprovable { status }),
    }
}

/// Whether the short video is out of the way for finalization.
///
/// No row at all counts as done: clients without a video provider must not
/// block schema and embed.
pub fn video_done(item: &ContentItem, short_video: Option<&Video>) -> bool {
    item.flags.short_video_generated || short_video.is_none_or(|v| v.status.is_terminal())
}

/// Whether the podcast is out of the way for finalization (absent counts as done)
pub fn podcast_done(item: &ContentItem, podcast: Option<&Podcast>) -> bool {
    item.flags.podcast_generated || podcast.is_none_or(|p| p.status.is_terminal())
}

/// Gate for the schema and embed stages: both media tracks must be settled
pub fn media_done(item: &ContentItem, short_video: Option<&Video>, podcast: Option<&Podcast>) -> bool {
    video_done(item, short_video) && podcast_done(item, podcast)
}
