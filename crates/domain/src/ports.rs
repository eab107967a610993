//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    BlogPost, ClientProfile, ContentImage, ContentItem, ItemFilter, ItemPatch, Podcast,
    SocialMedia, SocialPlatform, SocialPost, Video,
};

/// Classified failure of an external service call
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Content generation

/// Inputs for writing a blog article
#[derive(Debug, Clone)]
pub struct BlogRequest {
    pub client_name: String,
    pub website: String,
    pub phone: Option<String>,
    pub question: String,
    pub location_label: String,
}

/// Generated article ready for publishing
#[derive(Debug, Clone, PartialEq)]
pub struct BlogDraft {
    pub title: String,
    pub slug: String,
    pub html: String,
    pub excerpt: String,
    pub meta_description: String,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub question: String,
    pub location_label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    pub alt_text: String,
}

#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub client_name: String,
    pub question: String,
    pub location_label: String,
    pub blog_url: Option<String>,
    pub platforms: Vec<SocialPlatform>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialCaption {
    pub platform: SocialPlatform,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PodcastRequest {
    pub client_name: String,
    pub title: String,
    pub blog_html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PodcastAudio {
    pub audio_url: String,
    pub duration_secs: Option<u32>,
    pub title: String,
    pub description: String,
}

/// Port for the external content-generation service
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn write_blog(&self, request: &BlogRequest) -> Result<BlogDraft, AdapterError>;

    async fn create_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, AdapterError>;

    async fn write_social_captions(
        &self,
        request: &CaptionRequest,
    ) -> Result<Vec<SocialCaption>, AdapterError>;

    async fn narrate_podcast(&self, request: &PodcastRequest)
    -> Result<PodcastAudio, AdapterError>;
}

// ---------------------------------------------------------------------------
// Blog

/// Result of a successful blog publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedBlog {
    pub post_id: u64,
    pub url: String,
}

/// Current remote content of a blog post
#[derive(Debug, Clone, PartialEq)]
pub struct BlogDocument {
    pub post_id: u64,
    pub content: String,
}

/// Port for the client's blog (WordPress)
#[async_trait]
pub trait BlogPublisher: Send + Sync {
    async fn publish(&self, draft: &BlogDraft) -> Result<PublishedBlog, AdapterError>;

    async fn fetch(&self, post_id: u64) -> Result<BlogDocument, AdapterError>;

    /// Replace the post content wholesale
    async fn update(&self, post_id: u64, content: &str) -> Result<(), AdapterError>;
}

// ---------------------------------------------------------------------------
// Social

#[derive(Debug, Clone)]
pub struct SocialPostRequest {
    pub platform: SocialPlatform,
    pub caption: String,
    pub media: SocialMedia,
    pub media_url: Option<String>,
    pub link_url: Option<String>,
    pub scheduled_for: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledPost {
    pub provider_id: String,
}

/// Provider-side state of a scheduled post.
///
/// A published post always carries its URL and a failed one always carries a
/// message; adapters fill in fallbacks when the provider omits them.
#[derive(Debug, Clone, PartialEq)]
pub enum SocialStatus {
    Pending,
    Published { url: String },
    Failed { error: String },
}

/// Port for the social scheduling service
#[async_trait]
pub trait SocialScheduler: Send + Sync {
    async fn schedule(&self, post: &SocialPostRequest) -> Result<ScheduledPost, AdapterError>;

    async fn check_status(&self, provider_id: &str) -> Result<SocialStatus, AdapterError>;
}

// ---------------------------------------------------------------------------
// Podcast

#[derive(Debug, Clone)]
pub struct EpisodeRequest {
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEpisode {
    pub episode_id: String,
    pub url: String,
    pub player_url: String,
}

/// Port for the podcast host (Podbean)
#[async_trait]
pub trait PodcastPublisher: Send + Sync {
    async fn publish(&self, episode: &EpisodeRequest) -> Result<PublishedEpisode, AdapterError>;
}

// ---------------------------------------------------------------------------
// Video

#[derive(Debug, Clone)]
pub struct VideoJobRequest {
    pub title: String,
    pub script: String,
    pub source_url: Option<String>,
    pub image_urls: Vec<String>,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoJobStatus {
    Processing,
    Completed {
        video_url: String,
        thumbnail_url: Option<String>,
        duration_secs: Option<u32>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedVideo {
    pub video_id: String,
    pub url: String,
}

/// Port for short-video rendering and long-form upload
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn submit_job(&self, request: &VideoJobRequest) -> Result<VideoJob, AdapterError>;

    async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus, AdapterError>;

    async fn upload(
        &self,
        bytes: Vec<u8>,
        metadata: &VideoMetadata,
    ) -> Result<UploadedVideo, AdapterError>;
}

// ---------------------------------------------------------------------------
// Photos

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: String,
    pub url: String,
    pub description: Option<String>,
}

/// Port for real business photos (Google Business Profile)
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn list_photos(&self, account: &str) -> Result<Vec<Photo>, AdapterError>;
}

// ---------------------------------------------------------------------------
// Persistence

/// Error type for content store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Port for the durable record store
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a new item; `Conflict` if the topic already exists for the client
    async fn insert_item(&self, item: &ContentItem) -> Result<(), StoreError>;

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StoreError>;

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ContentItem>, StoreError>;

    /// Apply a narrow patch and return the updated record
    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> Result<ContentItem, StoreError>;

    /// Remove an item and its child records; returns whether it existed
    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn save_blog_post(&self, post: &BlogPost) -> Result<(), StoreError>;

    async fn get_blog_post(&self, item_id: Uuid) -> Result<Option<BlogPost>, StoreError>;

    async fn add_images(&self, images: &[ContentImage]) -> Result<(), StoreError>;

    async fn list_images(&self, item_id: Uuid) -> Result<Vec<ContentImage>, StoreError>;

    /// Insert or replace a social post by id
    async fn save_social_post(&self, post: &SocialPost) -> Result<(), StoreError>;

    async fn list_social_posts(&self, item_id: Uuid) -> Result<Vec<SocialPost>, StoreError>;

    /// Posts in `Processing` with a provider id, across all items
    async fn list_processing_social_posts(&self) -> Result<Vec<SocialPost>, StoreError>;

    /// Insert or replace a video by id
    async fn save_video(&self, video: &Video) -> Result<(), StoreError>;

    async fn list_videos(&self, item_id: Uuid) -> Result<Vec<Video>, StoreError>;

    /// Videos in `Processing` with a job id, across all items
    async fn list_processing_videos(&self) -> Result<Vec<Video>, StoreError>;

    async fn save_podcast(&self, podcast: &Podcast) -> Result<(), StoreError>;

    async fn get_podcast(&self, item_id: Uuid) -> Result<Option<Podcast>, StoreError>;
}

// ---------------------------------------------------------------------------
// Tenancy

/// Resolves client profiles and the adapters configured for each client.
///
/// `None` from any adapter accessor means the client has no credentials for
/// that service; stages treat that as a skip rather than a failure. The
/// content generator is shared by every client and always present.
pub trait ClientServices: Send + Sync {
    fn profile(&self, client_id: &str) -> Option<ClientProfile>;

    fn generator(&self) -> Arc<dyn ContentGenerator>;

    fn blog(&self, client_id: &str) -> Option<Arc<dyn BlogPublisher>>;

    fn podcast(&self, client_id: &str) -> Option<Arc<dyn PodcastPublisher>>;

    fn social(&self, client_id: &str) -> Option<Arc<dyn SocialScheduler>>;

    /// Scheduler for the directory's own accounts
    fn directory_social(&self) -> Option<Arc<dyn SocialScheduler>>;

    /// Platforms the directory posts to
    fn directory_platforms(&self) -> Vec<SocialPlatform>;

    fn video(&self, client_id: &str) -> Option<Arc<dyn VideoProvider>>;

    fn photos(&self, client_id: &str) -> Option<Arc<dyn PhotoSource>>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
