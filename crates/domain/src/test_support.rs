//! In-memory fakes for every port, shared by the use case tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use crate::model::{
    BlogPost, ClientProfile, ContentImage, ContentItem, ItemFilter, ItemPatch, Podcast,
    ServiceLocation, SocialPlatform, SocialPost, SocialPostStatus, Video, VideoStatus,
};
use crate::ports::{
    AdapterError, BlogDocument, BlogDraft, BlogPublisher, BlogRequest, CaptionRequest,
    ClientServices, Clock, ContentGenerator, ContentStore, EpisodeRequest, GeneratedImage,
    ImageRequest, PhotoSource, PodcastAudio, PodcastPublisher, PodcastRequest, PublishedBlog,
    PublishedEpisode, ScheduledPost, SocialCaption, SocialPostRequest, SocialScheduler,
    SocialStatus, StoreError, UploadedVideo, VideoJob, VideoJobRequest, VideoJobStatus,
    VideoMetadata, VideoProvider,
};
use crate::usecases::{EmbedComposer, Pipeline, PipelineConfig};

pub(crate) fn client_profile() -> ClientProfile {
    ClientProfile {
        id: "acme".to_string(),
        name: "Acme Auto Glass".to_string(),
        website: "https://acme.test".to_string(),
        phone: Some("555-0100".to_string()),
        street_address: Some("1 Main St".to_string()),
        city: "Seattle".to_string(),
        state: "WA".to_string(),
        postal_code: Some("98101".to_string()),
        rating: Some(4.8),
        review_count: Some(120),
        logo_url: None,
        map_embed_url: Some("https://maps.test/embed?q=acme".to_string()),
        photo_account: None,
        social_platforms: vec![SocialPlatform::Facebook],
        paa_questions: vec![],
        locations: vec![ServiceLocation::new("Seattle", "WA")],
    }
}

// ---------------------------------------------------------------------------
// Store

#[derive(Default)]
pub(crate) struct FakeStore {
    items: Mutex<HashMap<Uuid, ContentItem>>,
    blogs: Mutex<HashMap<Uuid, BlogPost>>,
    images: Mutex<Vec<ContentImage>>,
    social: Mutex<Vec<SocialPost>>,
    videos: Mutex<Vec<Video>>,
    podcasts: Mutex<HashMap<Uuid, Podcast>>,
    broken_video_jobs: Mutex<Vec<String>>,
}

impl FakeStore {
    /// Drop the item but keep its child rows
    pub(crate) fn remove_item_only(&self, id: Uuid) {
        self.items.lock().unwrap().remove(&id);
    }

    /// Make saves of the video with this job id fail like a dropped connection
    pub(crate) fn fail_video_saves(&self, job_id: &str) {
        self.broken_video_jobs.lock().unwrap().push(job_id.to_string());
    }

    pub(crate) fn heal(&self) {
        self.broken_video_jobs.lock().unwrap().clear();
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn insert_item(&self, item: &ContentItem) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap();
        let key = item.topic_key();
        if items.values().any(|i| i.topic_key() == key) {
            return Err(StoreError::Conflict(item.paa_question.clone()));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StoreError> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ContentItem>, StoreError> {
        let mut items: Vec<_> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        items.sort_by_key(|i| i.scheduled_at);
        Ok(items)
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> Result<ContentItem, StoreError> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(item, OffsetDateTime::now_utc());
        Ok(item.clone())
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        let existed = self.items.lock().unwrap().remove(&id).is_some();
        self.blogs.lock().unwrap().remove(&id);
        self.images.lock().unwrap().retain(|i| i.item_id != id);
        self.social.lock().unwrap().retain(|p| p.item_id != id);
        self.videos.lock().unwrap().retain(|v| v.item_id != id);
        self.podcasts.lock().unwrap().remove(&id);
        Ok(existed)
    }

    async fn save_blog_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        self.blogs
            .lock()
            .unwrap()
            .insert(post.item_id, post.clone());
        Ok(())
    }

    async fn get_blog_post(&self, item_id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        Ok(self.blogs.lock().unwrap().get(&item_id).cloned())
    }

    async fn add_images(&self, images: &[ContentImage]) -> Result<(), StoreError> {
        self.images.lock().unwrap().extend_from_slice(images);
        Ok(())
    }

    async fn list_images(&self, item_id: Uuid) -> Result<Vec<ContentImage>, StoreError> {
        Ok(self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn save_social_post(&self, post: &SocialPost) -> Result<(), StoreError> {
        let mut posts = self.social.lock().unwrap();
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post.clone(),
            None => posts.push(post.clone()),
        }
        Ok(())
    }

    async fn list_social_posts(&self, item_id: Uuid) -> Result<Vec<SocialPost>, StoreError> {
        Ok(self
            .social
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_processing_social_posts(&self) -> Result<Vec<SocialPost>, StoreError> {
        Ok(self
            .social
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.status == SocialPostStatus::Processing && p.provider_post_id.is_some())
            .cloned()
            .collect())
    }

    async fn save_video(&self, video: &Video) -> Result<(), StoreError> {
        if let Some(job_id) = &video.provider_job_id {
            if self.broken_video_jobs.lock().unwrap().contains(job_id) {
                return Err(StoreError::Database("database is locked".to_string()));
            }
        }
        let mut videos = self.videos.lock().unwrap();
        match videos.iter_mut().find(|v| v.id == video.id) {
            Some(existing) => *existing = video.clone(),
            None => videos.push(video.clone()),
        }
        Ok(())
    }

    async fn list_videos(&self, item_id: Uuid) -> Result<Vec<Video>, StoreError> {
        Ok(self
            .videos
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_processing_videos(&self) -> Result<Vec<Video>, StoreError> {
        Ok(self
            .videos
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.status == VideoStatus::Processing && v.provider_job_id.is_some())
            .cloned()
            .collect())
    }

    async fn save_podcast(&self, podcast: &Podcast) -> Result<(), StoreError> {
        self.podcasts
            .lock()
            .unwrap()
            .insert(podcast.item_id, podcast.clone());
        Ok(())
    }

    async fn get_podcast(&self, item_id: Uuid) -> Result<Option<Podcast>, StoreError> {
        Ok(self.podcasts.lock().unwrap().get(&item_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Clock

pub(crate) struct FakeClock {
    time: Mutex<OffsetDateTime>,
}

impl FakeClock {
    pub(crate) fn new(time: OffsetDateTime) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        *self.time.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Generator

#[derive(Default)]
pub(crate) struct FakeGenerator {
    blog_calls: AtomicUsize,
    podcast_calls: AtomicUsize,
    fail_blog: Mutex<bool>,
}

impl FakeGenerator {
    pub(crate) fn blog_calls(&self) -> usize {
        self.blog_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn podcast_calls(&self) -> usize {
        self.podcast_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_blog(&self, fail: bool) {
        *self.fail_blog.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn write_blog(&self, request: &BlogRequest) -> Result<BlogDraft, AdapterError> {
        self.blog_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_blog.lock().unwrap() {
            return Err(AdapterError::Api {
                status: 503,
                message: "generator overloaded".to_string(),
            });
        }
        Ok(BlogDraft {
            title: request.question.clone(),
            slug: "windshield-answer".to_string(),
            html: format!("<p>{} answered for {}.</p>", request.question, request.location_label),
            excerpt: "Short answer.".to_string(),
            meta_description: "Answer".to_string(),
        })
    }

    async fn create_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, AdapterError> {
        Ok((0..request.count)
            .map(|i| GeneratedImage {
                url: format!("https://img.test/{}.png", i),
                alt_text: format!("image {}", i),
            })
            .collect())
    }

    async fn write_social_captions(
        &self,
        request: &CaptionRequest,
    ) -> Result<Vec<SocialCaption>, AdapterError> {
        Ok(request
            .platforms
            .iter()
            .map(|platform| SocialCaption {
                platform: *platform,
                text: format!("{} ({})", request.question, platform),
            })
            .collect())
    }

    async fn narrate_podcast(
        &self,
        request: &PodcastRequest,
    ) -> Result<PodcastAudio, AdapterError> {
        self.podcast_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PodcastAudio {
            audio_url: "https://audio.test/episode.mp3".to_string(),
            duration_secs: Some(240),
            title: request.title.clone(),
            description: format!("{} explains", request.client_name),
        })
    }
}

// ---------------------------------------------------------------------------
// Blog

pub(crate) struct FakeBlog {
    documents: Mutex<HashMap<u64, String>>,
    next_id: Mutex<u64>,
    publish_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_updates: Mutex<bool>,
}

impl Default for FakeBlog {
    fn default() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            next_id: Mutex::new(7),
            publish_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            fail_updates: Mutex::new(false),
        }
    }
}

impl FakeBlog {
    pub(crate) fn seed(&self, post_id: u64, content: &str) {
        self.documents
            .lock()
            .unwrap()
            .insert(post_id, content.to_string());
    }

    pub(crate) fn document(&self, post_id: u64) -> String {
        self.documents
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().unwrap() = fail;
    }
}

#[async_trait]
impl BlogPublisher for FakeBlog {
    async fn publish(&self, draft: &BlogDraft) -> Result<PublishedBlog, AdapterError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        let post_id = {
            let mut next = self.next_id.lock().unwrap();
            let id = *next;
            *next += 1;
            id
        };
        self.seed(post_id, &draft.html);
        Ok(PublishedBlog {
            post_id,
            url: format!("https://acme.test/blog/{}", draft.slug),
        })
    }

    async fn fetch(&self, post_id: u64) -> Result<BlogDocument, AdapterError> {
        let content = self
            .documents
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .ok_or(AdapterError::Api {
                status: 404,
                message: "post not found".to_string(),
            })?;
        Ok(BlogDocument { post_id, content })
    }

    async fn update(&self, post_id: u64, content: &str) -> Result<(), AdapterError> {
        if *self.fail_updates.lock().unwrap() {
            return Err(AdapterError::Network("connection reset".to_string()));
        }
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.seed(post_id, content);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Social

#[derive(Default)]
pub(crate) struct FakeSocial {
    statuses: Mutex<HashMap<String, SocialStatus>>,
    broken_status: Mutex<Vec<String>>,
    failing_platforms: Mutex<Vec<SocialPlatform>>,
    scheduled: AtomicUsize,
}

impl FakeSocial {
    pub(crate) fn set_status(&self, provider_id: &str, status: SocialStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(provider_id.to_string(), status);
    }

    pub(crate) fn fail_status(&self, provider_id: &str) {
        self.broken_status
            .lock()
            .unwrap()
            .push(provider_id.to_string());
    }

    pub(crate) fn fail_platform(&self, platform: SocialPlatform) {
        self.failing_platforms.lock().unwrap().push(platform);
    }

    pub(crate) fn recover_platform(&self, platform: SocialPlatform) {
        self.failing_platforms.lock().unwrap().retain(|p| *p != platform);
    }

    pub(crate) fn scheduled_calls(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialScheduler for FakeSocial {
    async fn schedule(&self, post: &SocialPostRequest) -> Result<ScheduledPost, AdapterError> {
        if self.failing_platforms.lock().unwrap().contains(&post.platform) {
            return Err(AdapterError::Api {
                status: 422,
                message: format!("{} account disconnected", post.platform),
            });
        }
        let n = self.scheduled.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ScheduledPost {
            provider_id: format!("late-{}", n),
        })
    }

    async fn check_status(&self, provider_id: &str) -> Result<SocialStatus, AdapterError> {
        if self
            .broken_status
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == provider_id)
        {
            return Err(AdapterError::Network("timeout talking to scheduler".to_string()));
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(provider_id)
            .cloned()
            .unwrap_or(SocialStatus::Pending))
    }
}

// ---------------------------------------------------------------------------
// Podcast

#[derive(Default)]
pub(crate) struct FakePodcast {
    publish_calls: AtomicUsize,
}

impl FakePodcast {
    pub(crate) fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PodcastPublisher for FakePodcast {
    async fn publish(&self, _episode: &EpisodeRequest) -> Result<PublishedEpisode, AdapterError> {
        let n = self.publish_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PublishedEpisode {
            episode_id: format!("ep-{}", n),
            url: format!("https://pod.test/e/ep-{}", n),
            player_url: format!("https://pod.test/player/ep-{}", n),
        })
    }
}

// ---------------------------------------------------------------------------
// Video

#[derive(Default)]
pub(crate) struct FakeVideo {
    jobs: Mutex<HashMap<String, VideoJobStatus>>,
    submitted: AtomicUsize,
    status_calls: AtomicUsize,
    stall_uploads: Mutex<bool>,
}

impl FakeVideo {
    pub(crate) fn complete(&self, job_id: &str, url: &str) {
        self.jobs.lock().unwrap().insert(
            job_id.to_string(),
            VideoJobStatus::Completed {
                video_url: url.to_string(),
                thumbnail_url: Some(format!("{}.jpg", url)),
                duration_secs: Some(42),
            },
        );
    }

    pub(crate) fn fail(&self, job_id: &str, error: &str) {
        self.jobs.lock().unwrap().insert(
            job_id.to_string(),
            VideoJobStatus::Failed {
                error: error.to_string(),
            },
        );
    }

    pub(crate) fn stall_uploads(&self, stall: bool) {
        *self.stall_uploads.lock().unwrap() = stall;
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoProvider for FakeVideo {
    async fn submit_job(&self, _request: &VideoJobRequest) -> Result<VideoJob, AdapterError> {
        let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(VideoJob {
            job_id: format!("job-{}", n),
        })
    }

    async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus, AdapterError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or(VideoJobStatus::Processing))
    }

    async fn upload(
        &self,
        _bytes: Vec<u8>,
        _metadata: &VideoMetadata,
    ) -> Result<UploadedVideo, AdapterError> {
        let stall = *self.stall_uploads.lock().unwrap();
        if stall {
            futures::future::pending::<()>().await;
        }
        Ok(UploadedVideo {
            video_id: "LONGUPLOAD1".to_string(),
            url: "https://www.youtube.com/watch?v=LONGUPLOAD1".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Services

pub(crate) struct FakeServices {
    client: ClientProfile,
    generator: Arc<FakeGenerator>,
    blog: Option<Arc<FakeBlog>>,
    podcast: Mutex<Option<Arc<FakePodcast>>>,
    social: Option<Arc<FakeSocial>>,
    directory: Option<(Arc<FakeSocial>, Vec<SocialPlatform>)>,
    video: Option<Arc<FakeVideo>>,
}

impl ClientServices for FakeServices {
    fn profile(&self, client_id: &str) -> Option<ClientProfile> {
        (client_id == self.client.id).then(|| self.client.clone())
    }

    fn generator(&self) -> Arc<dyn ContentGenerator> {
        self.generator.clone()
    }

    fn blog(&self, _client_id: &str) -> Option<Arc<dyn BlogPublisher>> {
        self.blog.clone().map(|b| b as Arc<dyn BlogPublisher>)
    }

    fn podcast(&self, _client_id: &str) -> Option<Arc<dyn PodcastPublisher>> {
        self.podcast
            .lock()
            .unwrap()
            .clone()
            .map(|p| p as Arc<dyn PodcastPublisher>)
    }

    fn social(&self, _client_id: &str) -> Option<Arc<dyn SocialScheduler>> {
        self.social.clone().map(|s| s as Arc<dyn SocialScheduler>)
    }

    fn directory_social(&self) -> Option<Arc<dyn SocialScheduler>> {
        self.directory
            .as_ref()
            .map(|(s, _)| s.clone() as Arc<dyn SocialScheduler>)
    }

    fn directory_platforms(&self) -> Vec<SocialPlatform> {
        self.directory
            .as_ref()
            .map(|(_, platforms)| platforms.clone())
            .unwrap_or_default()
    }

    fn video(&self, _client_id: &str) -> Option<Arc<dyn VideoProvider>> {
        self.video.clone().map(|v| v as Arc<dyn VideoProvider>)
    }

    fn photos(&self, _client_id: &str) -> Option<Arc<dyn PhotoSource>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Harness

pub(crate) type TestPipeline = Pipeline<FakeStore, FakeServices, FakeClock>;

pub(crate) struct Harness {
    pub store: Arc<FakeStore>,
    pub clock: Arc<FakeClock>,
    pub generator: Arc<FakeGenerator>,
    pub blog: Arc<FakeBlog>,
    pub social: Arc<FakeSocial>,
    pub podcast: Arc<FakePodcast>,
    pub video: Arc<FakeVideo>,
    pub services: Arc<FakeServices>,
    pub pipeline: Arc<TestPipeline>,
    client: ClientProfile,
    counter: AtomicUsize,
}

pub(crate) struct HarnessBuilder {
    client: ClientProfile,
    blog: bool,
    podcast: bool,
    social: bool,
    directory: Vec<SocialPlatform>,
    video: bool,
}

impl HarnessBuilder {
    pub(crate) fn without_blog(mut self) -> Self {
        self.blog = false;
        self
    }

    pub(crate) fn with_podcast(mut self) -> Self {
        self.podcast = true;
        self
    }

    pub(crate) fn with_social(mut self) -> Self {
        self.social = true;
        self
    }

    pub(crate) fn with_directory(mut self, platforms: Vec<SocialPlatform>) -> Self {
        self.directory = platforms;
        self
    }

    pub(crate) fn with_video(mut self) -> Self {
        self.video = true;
        self
    }

    pub(crate) fn build(self) -> Harness {
        let store = Arc::new(FakeStore::default());
        let clock = Arc::new(FakeClock::new(datetime!(2026-03-03 10:00 UTC)));
        let generator = Arc::new(FakeGenerator::default());
        let blog = Arc::new(FakeBlog::default());
        let social = Arc::new(FakeSocial::default());
        let podcast = Arc::new(FakePodcast::default());
        let video = Arc::new(FakeVideo::default());

        let services = Arc::new(FakeServices {
            client: self.client.clone(),
            generator: Arc::clone(&generator),
            blog: self.blog.then(|| Arc::clone(&blog)),
            podcast: Mutex::new(self.podcast.then(|| Arc::clone(&podcast))),
            social: self.social.then(|| Arc::clone(&social)),
            directory: (!self.directory.is_empty())
                .then(|| (Arc::clone(&social), self.directory.clone())),
            video: self.video.then(|| Arc::clone(&video)),
        });

        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&store),
            Arc::clone(&services),
            Arc::clone(&clock),
            PipelineConfig {
                long_video_timeout: Duration::from_millis(50),
                ..Default::default()
            },
        ));

        Harness {
            store,
            clock,
            generator,
            blog,
            social,
            podcast,
            video,
            services,
            pipeline,
            client: self.client,
            counter: AtomicUsize::new(0),
        }
    }
}

impl Harness {
    pub(crate) fn builder(client: ClientProfile) -> HarnessBuilder {
        HarnessBuilder {
            client,
            blog: true,
            podcast: false,
            social: false,
            directory: vec![],
            video: false,
        }
    }

    pub(crate) fn new(client: ClientProfile) -> Self {
        Self::builder(client).build()
    }

    pub(crate) fn composer(&self) -> EmbedComposer<'_, FakeStore, FakeServices, FakeClock> {
        self.pipeline.composer()
    }

    pub(crate) fn enable_podcast(&self) {
        *self.services.podcast.lock().unwrap() = Some(Arc::clone(&self.podcast));
    }

    /// A fresh item due now, with a unique question
    pub(crate) async fn scheduled_item(&self) -> ContentItem {
        self.item_scheduled_at(self.clock.now()).await
    }

    pub(crate) async fn item_scheduled_at(&self, at: OffsetDateTime) -> ContentItem {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let item = ContentItem::scheduled(
            self.client.id.clone(),
            format!("How much does windshield repair #{} cost?", n),
            ServiceLocation::new("Seattle", "WA"),
            at,
            self.clock.now(),
        );
        self.store.insert_item(&item).await.unwrap();
        item
    }
}

/// An item whose blog post is already live as WordPress post 7 with `body`
pub(crate) async fn published_item(harness: &Harness, body: &str) -> ContentItem {
    let item = harness.scheduled_item().await;
    harness.blog.seed(7, body);
    harness
        .store
        .save_blog_post(&BlogPost {
            item_id: item.id,
            title: "How much does windshield repair cost?".to_string(),
            slug: "windshield-repair-cost".to_string(),
            html: body.to_string(),
            excerpt: "Usually under $100.".to_string(),
            meta_description: "Windshield repair cost".to_string(),
            wordpress_post_id: Some(7),
            wordpress_url: Some("https://acme.test/blog/windshield-repair-cost".to_string()),
            schema_json: None,
            updated_at: harness.clock.now(),
        })
        .await
        .unwrap();
    harness
        .store
        .update_item(
            item.id,
            &ItemPatch {
                blog_generated: Some(true),
                wordpress_post_id: Some(7),
                wordpress_url: Some("https://acme.test/blog/windshield-repair-cost".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}
