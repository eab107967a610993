//! Stage bodies of the pipeline
//!
//! Each stage reloads the item, returns early when its flags or ids show the
//! work is done, and persists every step before making the next external call.

use std::sync::Arc;

use uuid::Uuid;

use crate::model::{
    BlogPost, ClientProfile, ContentImage, ContentItem, ImageSource, ItemPatch, Podcast,
    PodcastStatus, PostOwner, SocialMedia, SocialPlatform, SocialPost, SocialPostStatus,
    TransitionError, Video, VideoKind, VideoStatus,
};
use crate::ports::{
    AdapterError, BlogDraft, BlogRequest, CaptionRequest, ClientServices, Clock, ContentStore,
    EpisodeRequest, ImageRequest, PodcastRequest, SocialPostRequest, SocialScheduler, StoreError,
    VideoJobRequest, VideoMetadata, VideoProvider,
};
use crate::usecases::embed::{
    EmbedError, EmbedReport, resolve_long_video_url, resolve_short_video_url,
};
use crate::usecases::pipeline::Pipeline;
use crate::usecases::schema::{SchemaInput, build_schema};

/// Successful stage result
#[derive(Debug)]
pub(crate) enum Done {
    Completed(String),
    /// Added work to a stage without settling its earlier issues
    Extended(String),
    AlreadyDone,
    Embedded(EmbedReport),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum StageError {
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("{0}")]
    Deferred(String),
    #[error("{0}")]
    Precondition(String),
    #[error("content item no longer exists")]
    ItemGone,
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Adapter(AdapterError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<AdapterError> for StageError {
    fn from(error: AdapterError) -> Self {
        match error {
            AdapterError::NotConfigured(service) => Self::NotConfigured(service),
            other => Self::Adapter(other),
        }
    }
}

impl From<StoreError> for StageError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(_) => Self::ItemGone,
            other => Self::Store(other),
        }
    }
}

impl From<EmbedError> for StageError {
    fn from(error: EmbedError) -> Self {
        match error {
            EmbedError::BlogNotPublished => Self::Deferred("blog post not published".to_string()),
            EmbedError::BlogNotConfigured => Self::NotConfigured("WordPress".to_string()),
            EmbedError::UnknownClient(_) | EmbedError::MissingBlogPost => {
                Self::Precondition(error.to_string())
            }
            EmbedError::Adapter(e) => e.into(),
            EmbedError::Store(e) => e.into(),
        }
    }
}

/// The short video that counts: the most recent one
pub(crate) fn latest_short_video(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .filter(|v| v.kind == VideoKind::Short)
        .max_by_key(|v| v.created_at)
}

/// Schedulers and their platforms, client first
type Targets = Vec<(PostOwner, Arc<dyn SocialScheduler>, Vec<SocialPlatform>)>;

impl<St, Sv, Cl> Pipeline<St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    async fn current(&self, item_id: Uuid) -> Result<ContentItem, StageError> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or(StageError::ItemGone)
    }

    async fn apply(&self, item_id: Uuid, patch: ItemPatch) -> Result<ContentItem, StageError> {
        Ok(self.store.update_item(item_id, &patch).await?)
    }

    pub(crate) async fn blog_stage(
        &self,
        item_id: Uuid,
        client: &ClientProfile,
    ) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        let publisher = self.services.blog(&item.client_id);
        if item.flags.blog_generated && (item.blog_published() || publisher.is_none()) {
            return Ok(Done::AlreadyDone);
        }

        let mut blog = match self.store.get_blog_post(item_id).await? {
            Some(blog) => blog,
            None => {
                let draft = self
                    .services
                    .generator()
                    .write_blog(&BlogRequest {
                        client_name: client.name.clone(),
                        website: client.website.clone(),
                        phone: client.phone.clone(),
                        question: item.paa_question.clone(),
                        location_label: item.location.label(),
                    })
                    .await?;
                let blog = BlogPost {
                    item_id,
                    title: draft.title,
                    slug: draft.slug,
                    html: draft.html,
                    excerpt: draft.excerpt,
                    meta_description: draft.meta_description,
                    wordpress_post_id: None,
                    wordpress_url: None,
                    schema_json: None,
                    updated_at: self.clock.now(),
                };
                self.store.save_blog_post(&blog).await?;
                blog
            }
        };
        if !item.flags.blog_generated {
            self.apply(
                item_id,
                ItemPatch {
                    blog_generated: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        }

        let Some(publisher) = publisher else {
            return Err(StageError::NotConfigured("WordPress".to_string()));
        };

        // A publish that landed before the item patch did
        if let (Some(post_id), Some(url)) = (blog.wordpress_post_id, blog.wordpress_url.clone()) {
            self.apply(
                item_id,
                ItemPatch {
                    wordpress_post_id: Some(post_id),
                    wordpress_url: Some(url),
                    ..Default::default()
                },
            )
            .await?;
            return Ok(Done::Completed(format!("recovered post {}", post_id)));
        }

        // The map goes in once, with the first publish
        let html = match &client.map_embed_url {
            Some(map_url) => format!(
                "{}\n\n{}",
                blog.html,
                self.renderer.map(map_url, &item.location.label())
            ),
            None => blog.html.clone(),
        };
        let published = publisher
            .publish(&BlogDraft {
                title: blog.title.clone(),
                slug: blog.slug.clone(),
                html,
                excerpt: blog.excerpt.clone(),
                meta_description: blog.meta_description.clone(),
            })
            .await?;

        blog.wordpress_post_id = Some(published.post_id);
        blog.wordpress_url = Some(published.url.clone());
        blog.updated_at = self.clock.now();
        self.store.save_blog_post(&blog).await?;
        self.apply(
            item_id,
            ItemPatch {
                wordpress_post_id: Some(published.post_id),
                wordpress_url: Some(published.url.clone()),
                ..Default::default()
            },
        )
        .await?;

        Ok(Done::Completed(format!(
            "published post {} at {}",
            published.post_id, published.url
        )))
    }

    pub(crate) async fn podcast_stage(&self, item_id: Uuid) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        if item.flags.podcast_generated {
            return Ok(Done::AlreadyDone);
        }
        let Some(publisher) = self.services.podcast(&item.client_id) else {
            return Err(StageError::NotConfigured("Podbean".to_string()));
        };
        let blog = self
            .store
            .get_blog_post(item_id)
            .await?
            .ok_or_else(|| StageError::Precondition("no blog post to narrate".to_string()))?;

        let existing = self.store.get_podcast(item_id).await?;
        let mut podcast = match existing {
            Some(podcast) if podcast.audio_url.is_some() => podcast,
            _ => {
                let client_name = self
                    .services
                    .profile(&item.client_id)
                    .map(|c| c.name)
                    .unwrap_or_else(|| item.client_id.clone());
                let audio = self
                    .services
                    .generator()
                    .narrate_podcast(&PodcastRequest {
                        client_name,
                        title: blog.title.clone(),
                        blog_html: blog.html.clone(),
                    })
                    .await?;
                let podcast = Podcast {
                    item_id,
                    status: PodcastStatus::Ready,
                    title: audio.title,
                    description: audio.description,
                    audio_url: Some(audio.audio_url),
                    duration_secs: audio.duration_secs,
                    episode_id: None,
                    episode_url: None,
                    player_url: None,
                    error_message: None,
                    updated_at: self.clock.now(),
                };
                self.store.save_podcast(&podcast).await?;
                podcast
            }
        };

        if podcast.status == PodcastStatus::Published {
            self.apply(
                item_id,
                ItemPatch {
                    podcast_generated: Some(true),
                    podbean_episode_id: podcast.episode_id.clone(),
                    podbean_url: podcast.episode_url.clone(),
                    podbean_player_url: podcast.player_url.clone(),
                    ..Default::default()
                },
            )
            .await?;
            return Ok(Done::Completed("recovered published episode".to_string()));
        }

        let featured = self
            .store
            .list_images(item_id)
            .await?
            .into_iter()
            .find(|i| i.featured)
            .map(|i| i.url);
        let request = EpisodeRequest {
            title: podcast.title.clone(),
            description: podcast.description.clone(),
            audio_url: podcast.audio_url.clone().unwrap_or_default(),
            image_url: featured,
        };

        match publisher.publish(&request).await {
            Ok(episode) => {
                podcast.status = PodcastStatus::Published;
                podcast.episode_id = Some(episode.episode_id.clone());
                podcast.episode_url = Some(episode.url.clone());
                podcast.player_url = Some(episode.player_url.clone());
                podcast.error_message = None;
                podcast.updated_at = self.clock.now();
                self.store.save_podcast(&podcast).await?;
                self.apply(
                    item_id,
                    ItemPatch {
                        podcast_generated: Some(true),
                        podbean_episode_id: Some(episode.episode_id.clone()),
                        podbean_url: Some(episode.url),
                        podbean_player_url: Some(episode.player_url),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(Done::Completed(format!(
                    "published episode {}",
                    episode.episode_id
                )))
            }
            Err(e) => {
                podcast.status = PodcastStatus::Failed;
                podcast.error_message = Some(e.to_string());
                podcast.updated_at = self.clock.now();
                self.store.save_podcast(&podcast).await?;
                Err(e.into())
            }
        }
    }

    pub(crate) async fn images_stage(
        &self,
        item_id: Uuid,
        client: &ClientProfile,
    ) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        if item.flags.images_generated {
            return Ok(Done::AlreadyDone);
        }

        let generated = self
            .services
            .generator()
            .create_images(&ImageRequest {
                question: item.paa_question.clone(),
                location_label: item.location.label(),
                count: self.config.images_per_item,
            })
            .await?;

        let mut images: Vec<ContentImage> = generated
            .into_iter()
            .enumerate()
            .map(|(i, image)| ContentImage {
                id: Uuid::new_v4(),
                item_id,
                url: image.url,
                alt_text: image.alt_text,
                source: ImageSource::Generated,
                featured: i == 0,
            })
            .collect();
        let generated_count = images.len();

        if let (Some(source), Some(account)) = (
            self.services.photos(&item.client_id),
            client.photo_account.as_deref(),
        ) {
            match source.list_photos(account).await {
                Ok(photos) => images.extend(photos.into_iter().map(|photo| ContentImage {
                    id: Uuid::new_v4(),
                    item_id,
                    alt_text: photo
                        .description
                        .unwrap_or_else(|| format!("{} in {}", client.name, client.city)),
                    url: photo.url,
                    source: ImageSource::Photo,
                    featured: false,
                })),
                Err(e) => {
                    tracing::warn!(item_id = %item_id, account = %account, error = %e, "Failed to list business photos");
                }
            }
        }

        self.store.add_images(&images).await?;
        self.apply(
            item_id,
            ItemPatch {
                images_generated: Some(true),
                ..Default::default()
            },
        )
        .await?;

        Ok(Done::Completed(format!(
            "{} generated, {} photos",
            generated_count,
            images.len() - generated_count
        )))
    }

    fn social_targets(&self, client: &ClientProfile, video: bool) -> Targets {
        let mut targets: Targets = Vec::new();
        if let Some(scheduler) = self.services.social(&client.id) {
            let platforms = client
                .social_platforms
                .iter()
                .copied()
                .filter(|p| p.is_video_only() == video)
                .collect();
            targets.push((PostOwner::Client, scheduler, platforms));
        }
        if let Some(scheduler) = self.services.directory_social() {
            let platforms = self
                .services
                .directory_platforms()
                .into_iter()
                .filter(|p| p.is_video_only() == video)
                .collect();
            targets.push((PostOwner::Directory, scheduler, platforms));
        }
        targets
    }

    pub(crate) async fn social_stage(
        &self,
        item_id: Uuid,
        client: &ClientProfile,
    ) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        if item.flags.social_generated {
            return Ok(Done::AlreadyDone);
        }
        let targets = self.social_targets(client, false);
        if targets.is_empty() {
            return Err(StageError::NotConfigured("social scheduler".to_string()));
        }

        let mut platforms: Vec<SocialPlatform> = targets
            .iter()
            .flat_map(|(_, _, platforms)| platforms.iter().copied())
            .collect();
        platforms.sort();
        platforms.dedup();

        let captions = if platforms.is_empty() {
            vec![]
        } else {
            self.services
                .generator()
                .write_social_captions(&CaptionRequest {
                    client_name: client.name.clone(),
                    question: item.paa_question.clone(),
                    location_label: item.location.label(),
                    blog_url: item.refs.wordpress_url.clone(),
                    platforms,
                })
                .await?
        };
        let media_url = self
            .store
            .list_images(item_id)
            .await?
            .into_iter()
            .find(|i| i.featured)
            .map(|i| i.url);

        let mut scheduled = 0;
        let mut failures = Vec::new();
        for (owner, scheduler, platforms) in targets {
            for platform in platforms {
                let caption = captions
                    .iter()
                    .find(|c| c.platform == platform)
                    .map(|c| c.text.clone())
                    .unwrap_or_else(|| item.paa_question.clone());
                let request = SocialPostRequest {
                    platform,
                    caption,
                    media: SocialMedia::Image,
                    media_url: media_url.clone(),
                    link_url: item.refs.wordpress_url.clone(),
                    scheduled_for: None,
                };
                match self
                    .schedule_post(&item, owner, scheduler.as_ref(), request)
                    .await?
                {
                    Some(Ok(())) => scheduled += 1,
                    Some(Err(message)) => failures.push(message),
                    None => {}
                }
            }
        }

        // A failed platform leaves the stage open so the next run retries it
        if !failures.is_empty() {
            return Err(StageError::Failed(failures.join("; ")));
        }

        self.apply(
            item_id,
            ItemPatch {
                social_generated: Some(true),
                ..Default::default()
            },
        )
        .await?;
        Ok(Done::Completed(format!("scheduled {} posts", scheduled)))
    }

    /// Create or resume the row for one (owner, platform) and hand it to the
    /// scheduler. `None` when a row is already with the provider or published.
    /// Failed rows are kept as history and a fresh row takes the retry.
    async fn schedule_post(
        &self,
        item: &ContentItem,
        owner: PostOwner,
        scheduler: &dyn SocialScheduler,
        request: SocialPostRequest,
    ) -> Result<Option<Result<(), String>>, StageError> {
        let rows: Vec<SocialPost> = self
            .store
            .list_social_posts(item.id)
            .await?
            .into_iter()
            .filter(|p| {
                p.owner == owner && p.platform == request.platform && p.media == request.media
            })
            .collect();
        if rows.iter().any(|p| {
            matches!(
                p.status,
                SocialPostStatus::Processing | SocialPostStatus::Published
            )
        }) {
            return Ok(None);
        }

        let resumable = rows
            .into_iter()
            .find(|p| p.status == SocialPostStatus::Scheduled);
        let mut post = match resumable {
            Some(post) => post,
            None => {
                let post = SocialPost::scheduled(
                    item.id,
                    owner,
                    request.platform,
                    request.media,
                    request.caption.clone(),
                    self.clock.now(),
                );
                self.store.save_social_post(&post).await?;
                post
            }
        };

        match scheduler.schedule(&request).await {
            Ok(scheduled) => {
                post.mark_processing(&scheduled.provider_id, self.clock.now())?;
                self.store.save_social_post(&post).await?;
                self.apply(
                    item.id,
                    ItemPatch {
                        social_post_ids: vec![(post.ref_key(), scheduled.provider_id.clone())],
                        ..Default::default()
                    },
                )
                .await?;
                tracing::info!(
                    item_id = %item.id,
                    owner = owner.as_str(),
                    platform = %request.platform,
                    provider_id = %scheduled.provider_id,
                    "Scheduled social post"
                );
                Ok(Some(Ok(())))
            }
            Err(e) => {
                tracing::warn!(
                    item_id = %item.id,
                    owner = owner.as_str(),
                    platform = %request.platform,
                    error = %e,
                    "Failed to schedule social post"
                );
                post.mark_failed(e.to_string(), self.clock.now())?;
                self.store.save_social_post(&post).await?;
                Ok(Some(Err(format!(
                    "{} {}: {}",
                    owner.as_str(),
                    request.platform,
                    e
                ))))
            }
        }
    }

    pub(crate) async fn video_stage(&self, item_id: Uuid) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        let videos = self.store.list_videos(item_id).await?;
        if latest_short_video(&videos).is_some_and(|v| v.status != VideoStatus::Failed) {
            return Ok(Done::AlreadyDone);
        }
        let Some(provider) = self.services.video(&item.client_id) else {
            return Err(StageError::NotConfigured("video provider".to_string()));
        };
        let blog = self
            .store
            .get_blog_post(item_id)
            .await?
            .ok_or_else(|| StageError::Precondition("no blog post to script".to_string()))?;
        let image_urls = self
            .store
            .list_images(item_id)
            .await?
            .into_iter()
            .map(|i| i.url)
            .collect();

        let job = provider
            .submit_job(&VideoJobRequest {
                title: blog.title.clone(),
                script: blog.excerpt.clone(),
                source_url: item.refs.wordpress_url.clone(),
                image_urls,
                aspect_ratio: self.config.video_aspect_ratio.clone(),
            })
            .await?;

        let video = Video::processing(item_id, VideoKind::Short, &job.job_id, self.clock.now());
        self.store.save_video(&video).await?;
        self.apply(
            item_id,
            ItemPatch {
                short_video_job_id: Some(job.job_id.clone()),
                ..Default::default()
            },
        )
        .await?;

        Ok(Done::Completed(format!("submitted job {}", job.job_id)))
    }

    /// Build and store the JSON-LD document. `force` rebuilds an existing one.
    pub(crate) async fn schema_stage(&self, item_id: Uuid, force: bool) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        if item.flags.schema_generated && !force {
            return Ok(Done::AlreadyDone);
        }
        let client = self.services.profile(&item.client_id).ok_or_else(|| {
            StageError::Precondition(format!("unknown client {}", item.client_id))
        })?;
        let mut blog = self
            .store
            .get_blog_post(item_id)
            .await?
            .ok_or_else(|| StageError::Precondition("no blog post to describe".to_string()))?;

        let images = self.store.list_images(item_id).await?;
        let videos = self.store.list_videos(item_id).await?;
        let podcast = self.store.get_podcast(item_id).await?;
        let posts = self.store.list_social_posts(item_id).await?;

        let schema = build_schema(&SchemaInput {
            item: &item,
            client: &client,
            blog: &blog,
            images: &images,
            short_video: latest_short_video(&videos),
            short_video_url: resolve_short_video_url(&posts),
            long_video_url: resolve_long_video_url(&item, &videos),
            podcast: podcast.as_ref(),
        });
        let nodes = schema["@graph"].as_array().map_or(0, Vec::len);

        blog.schema_json = Some(schema.to_string());
        blog.updated_at = self.clock.now();
        self.store.save_blog_post(&blog).await?;
        self.apply(
            item_id,
            ItemPatch {
                schema_generated: Some(true),
                ..Default::default()
            },
        )
        .await?;

        Ok(Done::Completed(format!("{} schema nodes", nodes)))
    }

    pub(crate) async fn embed_stage(&self, item_id: Uuid) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        if item.embeds.last_embedded_at.is_some() {
            return Ok(Done::AlreadyDone);
        }
        if self.services.blog(&item.client_id).is_none() {
            return Err(StageError::NotConfigured("WordPress".to_string()));
        }
        if !item.blog_published() {
            return Err(StageError::Deferred("blog post not published".to_string()));
        }
        let report = self.composer().compose(&item).await?;
        Ok(Done::Embedded(report))
    }

    /// Schedule the ready short video on video-only platforms
    pub(crate) async fn distribute_stage(
        &self,
        item_id: Uuid,
        client: &ClientProfile,
    ) -> Result<Done, StageError> {
        let item = self.current(item_id).await?;
        let videos = self.store.list_videos(item_id).await?;
        let Some(video_url) = latest_short_video(&videos)
            .filter(|v| matches!(v.status, VideoStatus::Ready | VideoStatus::Published))
            .and_then(|v| v.video_url.clone())
        else {
            return Err(StageError::Deferred("short video is not ready".to_string()));
        };

        let targets = self.social_targets(client, true);
        if targets.is_empty() {
            return Err(StageError::NotConfigured("social scheduler".to_string()));
        }

        let caption = match self.store.get_blog_post(item_id).await? {
            Some(blog) => format!("{} | {}", blog.title, client.name),
            None => format!("{} | {}", item.paa_question, client.name),
        };

        let mut scheduled = 0;
        let mut failures = Vec::new();
        for (owner, scheduler, platforms) in targets {
            for platform in platforms {
                let request = SocialPostRequest {
                    platform,
                    caption: caption.clone(),
                    media: SocialMedia::ShortVideo,
                    media_url: Some(video_url.clone()),
                    link_url: item.refs.wordpress_url.clone(),
                    scheduled_for: None,
                };
                match self
                    .schedule_post(&item, owner, scheduler.as_ref(), request)
                    .await?
                {
                    Some(Ok(())) => scheduled += 1,
                    Some(Err(message)) => failures.push(message),
                    None => {}
                }
            }
        }

        if failures.is_empty() {
            Ok(Done::Extended(format!(
                "scheduled short video on {} platforms",
                scheduled
            )))
        } else {
            Err(StageError::Failed(failures.join("; ")))
        }
    }

    pub(crate) async fn long_video_stage(
        &self,
        item_id: Uuid,
        provider: Arc<dyn VideoProvider>,
        bytes: Vec<u8>,
        metadata: &VideoMetadata,
    ) -> Result<Done, StageError> {
        let limit = self.config.long_video_timeout;
        let uploaded = tokio::time::timeout(limit, provider.upload(bytes, metadata))
            .await
            .map_err(|_| AdapterError::Timeout(limit))??;

        let video = Video::published(item_id, VideoKind::Long, &uploaded.url, self.clock.now());
        self.store.save_video(&video).await?;
        self.apply(
            item_id,
            ItemPatch {
                long_video_url: Some(uploaded.url.clone()),
                ..Default::default()
            },
        )
        .await?;

        Ok(Done::Extended(format!(
            "uploaded {} to {}",
            uploaded.video_id, uploaded.url
        )))
    }
}
