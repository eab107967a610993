//! Stub adapters for offline runs (`adapters = "stub"`)
//!
//! Every stub answers immediately and deterministically. Remote state (blog
//! documents, scheduled posts) lives in memory for the life of the process.

use async_trait::async_trait;
use paa_pipeline_domain::{
    AdapterError, BlogDocument, BlogDraft, BlogPublisher, BlogRequest, CaptionRequest,
    ContentGenerator, EpisodeRequest, GeneratedImage, ImageRequest, Photo, PhotoSource,
    PodcastAudio, PodcastPublisher, PodcastRequest, PublishedBlog, PublishedEpisode,
    ScheduledPost, SocialCaption, SocialPostRequest, SocialScheduler, SocialStatus,
    UploadedVideo, VideoJob, VideoJobRequest, VideoJobStatus, VideoMetadata, VideoProvider,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Generator that writes templated placeholder content
#[derive(Default)]
pub struct StubGenerator;

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn write_blog(&self, request: &BlogRequest) -> Result<BlogDraft, AdapterError> {
        Ok(BlogDraft {
            title: request.question.clone(),
            slug: slugify(&request.question),
            html: format!(
                "<h2>{}</h2>\n<p>{} serves drivers in {}.</p>",
                request.question, request.client_name, request.location_label
            ),
            excerpt: format!("{} answers: {}", request.client_name, request.question),
            meta_description: request.question.clone(),
        })
    }

    async fn create_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, AdapterError> {
        let slug = slugify(&request.question);
        Ok((1..=request.count)
            .map(|n| GeneratedImage {
                url: format!("https://stub.invalid/images/{}-{}.png", slug, n),
                alt_text: format!("{} ({})", request.question, request.location_label),
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
                text: match &request.blog_url {
                    Some(url) => format!("{} {}", request.question, url),
                    None => request.question.clone(),
                },
            })
            .collect())
    }

    async fn narrate_podcast(
        &self,
        request: &PodcastRequest,
    ) -> Result<PodcastAudio, AdapterError> {
        Ok(PodcastAudio {
            audio_url: format!("https://stub.invalid/audio/{}.mp3", slugify(&request.title)),
            duration_secs: Some(180),
            title: request.title.clone(),
            description: format!("{} on {}", request.client_name, request.title),
        })
    }
}

/// Blog that keeps documents in memory
pub struct StubBlog {
    next_id: AtomicU64,
    documents: Mutex<HashMap<u64, String>>,
}

impl Default for StubBlog {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            documents: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BlogPublisher for StubBlog {
    async fn publish(&self, draft: &BlogDraft) -> Result<PublishedBlog, AdapterError> {
        let post_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .insert(post_id, draft.html.clone());
        Ok(PublishedBlog {
            post_id,
            url: format!("https://stub.invalid/blog/{}", draft.slug),
        })
    }

    async fn fetch(&self, post_id: u64) -> Result<BlogDocument, AdapterError> {
        // Posts published by an earlier process are not remembered
        let content = self
            .documents
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .unwrap_or_else(|| format!("<p>Stub post {}</p>", post_id));
        Ok(BlogDocument { post_id, content })
    }

    async fn update(&self, post_id: u64, content: &str) -> Result<(), AdapterError> {
        self.documents
            .lock()
            .unwrap()
            .insert(post_id, content.to_string());
        Ok(())
    }
}

/// Social scheduler whose posts publish on the first status check
#[derive(Default)]
pub struct StubSocial {
    next_id: AtomicU64,
}

#[async_trait]
impl SocialScheduler for StubSocial {
    async fn schedule(&self, post: &SocialPostRequest) -> Result<ScheduledPost, AdapterError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ScheduledPost {
            provider_id: format!("stub-{}-{}", post.platform, n),
        })
    }

    async fn check_status(&self, provider_id: &str) -> Result<SocialStatus, AdapterError> {
        Ok(SocialStatus::Published {
            url: format!("https://stub.invalid/social/{}", provider_id),
        })
    }
}

#[derive(Default)]
pub struct StubPodcast {
    next_id: AtomicU64,
}

#[async_trait]
impl PodcastPublisher for StubPodcast {
    async fn publish(&self, _episode: &EpisodeRequest) -> Result<PublishedEpisode, AdapterError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PublishedEpisode {
            episode_id: format!("stub-ep-{}", n),
            url: format!("https://stub.invalid/podcast/{}", n),
            player_url: format!("https://stub.invalid/podcast/{}/player", n),
        })
    }
}

/// Video provider whose jobs complete on the first status check
#[derive(Default)]
pub struct StubVideo {
    next_id: AtomicU64,
}

#[async_trait]
impl VideoProvider for StubVideo {
    async fn submit_job(&self, _request: &VideoJobRequest) -> Result<VideoJob, AdapterError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(VideoJob {
            job_id: format!("stub-job-{}", n),
        })
    }

    async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus, AdapterError> {
        Ok(VideoJobStatus::Completed {
            video_url: format!("https://stub.invalid/video/{}.mp4", job_id),
            thumbnail_url: None,
            duration_secs: Some(30),
        })
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        _metadata: &VideoMetadata,
    ) -> Result<UploadedVideo, AdapterError> {
        let video_id = format!("stub{}", bytes.len());
        Ok(UploadedVideo {
            url: format!("https://www.youtube.com/watch?v={}", video_id),
            video_id,
        })
    }
}

/// Photo source with a fixed set of photos
#[derive(Default)]
pub struct StubPhotos {
    photos: Vec<Photo>,
}

impl StubPhotos {
    pub fn with_photos(photos: Vec<Photo>) -> Self {
        Self { photos }
    }
}

#[async_trait]
impl PhotoSource for StubPhotos {
    async fn list_photos(&self, _account: &str) -> Result<Vec<Photo>, AdapterError> {
        Ok(self.photos.clone())
    }
}
