//! In-memory content store for testing and stub mode

use async_trait::async_trait;
use paa_pipeline_domain::{
    BlogPost, ContentImage, ContentItem, ContentStore, ItemFilter, ItemPatch, Podcast,
    SocialPost, SocialPostStatus, StoreError, Video, VideoStatus,
};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use time::OffsetDateTime;
use uuid::Uuid;

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Database(e.to_string())
}

/// In-memory content store implementation
#[derive(Default)]
pub struct InMemoryContentStore {
    items: RwLock<HashMap<Uuid, ContentItem>>,
    blog_posts: RwLock<HashMap<Uuid, BlogPost>>,
    images: RwLock<Vec<ContentImage>>,
    social_posts: RwLock<Vec<SocialPost>>,
    videos: RwLock<Vec<Video>>,
    podcasts: RwLock<HashMap<Uuid, Podcast>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn insert_item(&self, item: &ContentItem) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(poisoned)?;
        let key = item.topic_key();
        if items.values().any(|existing| existing.topic_key() == key) {
            return Err(StoreError::Conflict(format!(
                "'{}' is already scheduled for {} in {}",
                item.paa_question,
                item.client_id,
                item.location.label()
            )));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StoreError> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(&id).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ContentItem>, StoreError> {
        let items = self.items.read().map_err(poisoned)?;
        let mut matching: Vec<ContentItem> = items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        matching.sort_by_key(|item| (item.scheduled_at, item.created_at));
        Ok(matching)
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> Result<ContentItem, StoreError> {
        let mut items = self.items.write().map_err(poisoned)?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("content item {}", id)))?;
        patch.apply_to(item, OffsetDateTime::now_utc());
        Ok(item.clone())
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        let existed = self.items.write().map_err(poisoned)?.remove(&id).is_some();
        self.blog_posts.write().map_err(poisoned)?.remove(&id);
        self.images
            .write()
            .map_err(poisoned)?
            .retain(|i| i.item_id != id);
        self.social_posts
            .write()
            .map_err(poisoned)?
            .retain(|p| p.item_id != id);
        self.videos
            .write()
            .map_err(poisoned)?
            .retain(|v| v.item_id != id);
        self.podcasts.write().map_err(poisoned)?.remove(&id);
        Ok(existed)
    }

    async fn save_blog_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        self.blog_posts
            .write()
            .map_err(poisoned)?
            .insert(post.item_id, post.clone());
        Ok(())
    }

    async fn get_blog_post(&self, item_id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        Ok(self
            .blog_posts
            .read()
            .map_err(poisoned)?
            .get(&item_id)
            .cloned())
    }

    async fn add_images(&self, images: &[ContentImage]) -> Result<(), StoreError> {
        self.images
            .write()
            .map_err(poisoned)?
            .extend_from_slice(images);
        Ok(())
    }

    async fn list_images(&self, item_id: Uuid) -> Result<Vec<ContentImage>, StoreError> {
        let images = self.images.read().map_err(poisoned)?;
        Ok(images
            .iter()
            .filter(|i| i.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn save_social_post(&self, post: &SocialPost) -> Result<(), StoreError> {
        let mut posts = self.social_posts.write().map_err(poisoned)?;
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post.clone(),
            None => posts.push(post.clone()),
        }
        Ok(())
    }

    async fn list_social_posts(&self, item_id: Uuid) -> Result<Vec<SocialPost>, StoreError> {
        let posts = self.social_posts.read().map_err(poisoned)?;
        Ok(posts
            .iter()
            .filter(|p| p.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_processing_social_posts(&self) -> Result<Vec<SocialPost>, StoreError> {
        let posts = self.social_posts.read().map_err(poisoned)?;
        Ok(posts
            .iter()
            .filter(|p| p.status == SocialPostStatus::Processing && p.provider_post_id.is_some())
            .cloned()
            .collect())
    }

    async fn save_video(&self, video: &Video) -> Result<(), StoreError> {
        let mut videos = self.videos.write().map_err(poisoned)?;
        match videos.iter_mut().find(|v| v.id == video.id) {
            Some(existing) => *existing = video.clone(),
            None => videos.push(video.clone()),
        }
        Ok(())
    }

    async fn list_videos(&self, item_id: Uuid) -> Result<Vec<Video>, StoreError> {
        let videos = self.videos.read().map_err(poisoned)?;
        Ok(videos
            .iter()
            .filter(|v| v.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_processing_videos(&self) -> Result<Vec<Video>, StoreError> {
        let videos = self.videos.read().map_err(poisoned)?;
        Ok(videos
            .iter()
            .filter(|v| v.status == VideoStatus::Processing && v.provider_job_id.is_some())
            .cloned()
            .collect())
    }

    async fn save_podcast(&self, podcast: &Podcast) -> Result<(), StoreError> {
        self.podcasts
            .write()
            .map_err(poisoned)?
            .insert(podcast.item_id, podcast.clone());
        Ok(())
    }

    async fn get_podcast(&self, item_id: Uuid) -> Result<Option<Podcast>, StoreError> {
        Ok(self
            .podcasts
            .read()
            .map_err(poisoned)?
            .get(&item_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paa_pipeline_domain::{ContentStatus, ServiceLocation, StageIssue, StageKind, IssueKind};
    use time::macros::datetime;

    fn item(question: &str) -> ContentItem {
        ContentItem::scheduled(
            "acme",
            question,
            ServiceLocation::new("Seattle", "WA"),
            datetime!(2026-03-03 09:00 UTC),
            datetime!(2026-03-01 09:00 UTC),
        )
    }

    #[tokio::test]
    async fn test_duplicate_topic_is_a_conflict() {
        let store = InMemoryContentStore::new();
        store.insert_item(&item("Is windshield repair covered?")).await.unwrap();

        let err = store
            .insert_item(&item("is windshield repair covered? "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_patch_only_touches_named_fields() {
        let store = InMemoryContentStore::new();
        let item = item("How long does ADAS calibration take?");
        store.insert_item(&item).await.unwrap();

        store
            .update_item(
                item.id,
                &ItemPatch {
                    blog_generated: Some(true),
                    wordpress_post_id: Some(11),
                    ..ItemPatch::new().issue(
                        StageKind::Social,
                        StageIssue::new(IssueKind::Failed, "boom", item.created_at),
                    )
                },
            )
            .await
            .unwrap();
        let updated = store
            .update_item(item.id, &ItemPatch::new().status(ContentStatus::Generating))
            .await
            .unwrap();

        assert!(updated.flags.blog_generated);
        assert_eq!(updated.refs.wordpress_post_id, Some(11));
        assert_eq!(updated.status, ContentStatus::Generating);
        assert!(updated.issues.contains_key(&StageKind::Social));
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let store = InMemoryContentStore::new();
        let err = store
            .update_item(Uuid::new_v4(), &ItemPatch::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
