//! Embed composer - layers media fragments onto the published blog post
//!
//! Composition is idempotent: every managed fragment is stripped from the
//! remote document by its markers before a fresh copy is inserted, so running
//! the composer repeatedly never accumulates duplicates. The map fragment is
//! the exception: it is placed once at first publish and never touched again.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::document_digest;
use crate::model::{
    ContentItem, ItemPatch, PostOwner, SocialMedia, SocialPlatform, SocialPost, SocialPostStatus,
    Video, VideoKind, VideoStatus,
};
use crate::ports::{AdapterError, ClientServices, Clock, ContentStore, StoreError};
use crate::usecases::render::{FragmentKind, Renderer};
use crate::usecases::schema::{SchemaInput, build_schema};
use crate::usecases::stages::latest_short_video;

static STRIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    // A block never spans another `<!--`, so a pair whose end marker was
    // edited away cannot swallow the article up to the next fragment.
    let mut patterns: Vec<Regex> = FragmentKind::REBUILT
        .iter()
        .map(|kind| {
            Regex::new(&format!(
                r"(?s){}(?:[^<]|<[^!])*?{}\s*",
                regex::escape(&kind.start_marker()),
                regex::escape(&kind.end_marker())
            ))
            .expect("Valid regex")
        })
        .collect();
    // Schema scripts pasted without markers (e.g. by an SEO plugin or an older run)
    patterns.push(
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>.*?</script>\s*"#)
            .expect("Valid regex"),
    );
    patterns
});

/// Markers left without their partner, each with the block it opened
static ORPHAN_PATTERNS: LazyLock<Vec<(FragmentKind, Regex)>> = LazyLock::new(|| {
    FragmentKind::REBUILT
        .iter()
        .map(|kind| {
            let block = match kind {
                FragmentKind::Schema => String::new(),
                _ => format!(
                    r#"(?:<div class="paa-{}"[^>]*>.*?</div>\s*)?"#,
                    kind.as_str()
                ),
            };
            let pattern = Regex::new(&format!(
                r"(?s)(?:{}\s*{}|{}\s*)",
                regex::escape(&kind.start_marker()),
                block,
                regex::escape(&kind.end_marker())
            ))
            .expect("Valid regex");
            (*kind, pattern)
        })
        .collect()
});

/// Remove every rebuilt fragment from a document, leaving the map and the
/// article body intact. Half-deleted fragments lose their remaining marker
/// and the block it opened.
pub fn strip_fragments(content: &str) -> String {
    let mut out = content.to_string();
    for pattern in STRIP_PATTERNS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    for (kind, pattern) in ORPHAN_PATTERNS.iter() {
        if pattern.is_match(&out) {
            tracing::warn!(fragment = %kind, "Removing fragment marker without a partner");
            out = pattern.replace_all(&out, "").into_owned();
        }
    }
    out.trim().to_string()
}

/// Why a fragment was left out of the composed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedSkip {
    NoShortVideo,
    ShortVideoNotPublished,
    NoLongVideo,
    NoPodcast,
}

impl EmbedSkip {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoShortVideo => "no short video has been generated",
            Self::ShortVideoNotPublished => "no YouTube post has a published URL yet",
            Self::NoLongVideo => "no long-form video has been uploaded",
            Self::NoPodcast => "no podcast player URL is available",
        }
    }

    /// The media exists but is not embeddable yet, so someone should look
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::ShortVideoNotPublished)
    }
}

impl fmt::Display for EmbedSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFragment {
    pub kind: FragmentKind,
    pub reason: EmbedSkip,
    pub message: String,
}

/// Result of one composition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedReport {
    pub item_id: Uuid,
    pub embedded: Vec<FragmentKind>,
    pub skipped: Vec<SkippedFragment>,
    /// A map placed at first publish is still in the document
    pub map_preserved: bool,
    /// SHA-256 of the content written back
    pub digest: String,
}

impl EmbedReport {
    pub fn summary(&self) -> String {
        let kinds: Vec<&str> = self.embedded.iter().map(FragmentKind::as_str).collect();
        format!("embedded {}", kinds.join(", "))
    }

    /// Combined message for skips that should raise attention
    pub fn pending(&self) -> Option<String> {
        let pending: Vec<&str> = self
            .skipped
            .iter()
            .filter(|s| s.reason.is_pending())
            .map(|s| s.reason.message())
            .collect();
        if pending.is_empty() {
            None
        } else {
            Some(pending.join("; "))
        }
    }

    pub fn skip_reason(&self, kind: FragmentKind) -> Option<EmbedSkip> {
        self.skipped
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("blog post has not been published yet")]
    BlogNotPublished,
    #[error("WordPress is not configured for this client")]
    BlogNotConfigured,
    #[error("Unknown client: {0}")]
    UnknownClient(String),
    #[error("no blog post record exists for this item")]
    MissingBlogPost,
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Public URL of the short video: the first published YouTube post, looking at
/// the client's own posts before the directory's.
pub fn resolve_short_video_url(posts: &[SocialPost]) -> Option<&str> {
    [PostOwner::Client, PostOwner::Directory]
        .into_iter()
        .find_map(|owner| {
            posts
                .iter()
                .filter(|p| {
                    p.owner == owner
                        && p.platform == SocialPlatform::Youtube
                        && p.media == SocialMedia::ShortVideo
                        && p.status == SocialPostStatus::Published
                })
                .find_map(|p| p.published_url.as_deref())
        })
}

/// Long-form video URL from the item reference or an uploaded long video row
pub fn resolve_long_video_url<'a>(item: &'a ContentItem, videos: &'a [Video]) -> Option<&'a str> {
    item.refs.long_video_url.as_deref().or_else(|| {
        videos
            .iter()
            .filter(|v| v.kind == VideoKind::Long && v.status != VideoStatus::Failed)
            .find_map(|v| v.video_url.as_deref())
    })
}

/// Composer bound to the ports it needs for one run
pub struct EmbedComposer<'a, St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    store: &'a St,
    services: &'a Sv,
    clock: &'a Cl,
    renderer: &'a Renderer,
}

impl<'a, St, Sv, Cl> EmbedComposer<'a, St, Sv, Cl>
where
    St: ContentStore + ?Sized,
    Sv: ClientServices + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: &'a St, services: &'a Sv, clock: &'a Cl, renderer: &'a Renderer) -> Self {
        Self {
            store,
            services,
            clock,
            renderer,
        }
    }

    /// Fetch, strip, rebuild and write back the item's blog post
    pub async fn compose(&self, item: &ContentItem) -> Result<EmbedReport, EmbedError> {
        let post_id = item
            .refs
            .wordpress_post_id
            .ok_or(EmbedError::BlogNotPublished)?;
        let client = self
            .services
            .profile(&item.client_id)
            .ok_or_else(|| EmbedError::UnknownClient(item.client_id.clone()))?;
        let publisher = self
            .services
            .blog(&item.client_id)
            .ok_or(EmbedError::BlogNotConfigured)?;
        let mut blog = self
            .store
            .get_blog_post(item.id)
            .await?
            .ok_or(EmbedError::MissingBlogPost)?;

        let images = self.store.list_images(item.id).await?;
        let videos = self.store.list_videos(item.id).await?;
        let podcast = self.store.get_podcast(item.id).await?;
        let social_posts = self.store.list_social_posts(item.id).await?;

        let document = publisher.fetch(post_id).await?;
        let body = strip_fragments(&document.content);
        let map_preserved = body.contains(&FragmentKind::Map.start_marker());

        let short_video = latest_short_video(&videos);
        let short_video_url = resolve_short_video_url(&social_posts);
        let long_video_url = resolve_long_video_url(item, &videos);
        let player_url = item
            .refs
            .podbean_player_url
            .as_deref()
            .or_else(|| podcast.as_ref().and_then(|p| p.player_url.as_deref()));

        let schema = build_schema(&SchemaInput {
            item,
            client: &client,
            blog: &blog,
            images: &images,
            short_video,
            short_video_url,
            long_video_url,
            podcast: podcast.as_ref(),
        });

        let mut embedded = vec![FragmentKind::Schema];
        let mut skipped = Vec::new();
        let mut head = vec![self.renderer.schema(&schema)];
        let mut tail = Vec::new();

        match short_video_url {
            Some(url) => {
                head.push(self.renderer.short_video(url, &blog.title));
                embedded.push(FragmentKind::ShortVideo);
            }
            None => {
                let expected = short_video.is_some_and(|v| v.status != VideoStatus::Failed)
                    || social_posts.iter().any(|p| {
                        p.platform == SocialPlatform::Youtube
                            && p.status != SocialPostStatus::Failed
                    });
                let reason = if expected {
                    EmbedSkip::ShortVideoNotPublished
                } else {
                    EmbedSkip::NoShortVideo
                };
                skipped.push(skip(FragmentKind::ShortVideo, reason));
            }
        }

        match long_video_url {
            Some(url) => {
                tail.push(self.renderer.long_video(url, &blog.title));
                embedded.push(FragmentKind::LongVideo);
            }
            None => skipped.push(skip(FragmentKind::LongVideo, EmbedSkip::NoLongVideo)),
        }

        match player_url {
            Some(url) => {
                let title = podcast
                    .as_ref()
                    .map(|p| p.title.as_str())
                    .unwrap_or(blog.title.as_str());
                tail.push(self.renderer.podcast(url, title));
                embedded.push(FragmentKind::Podcast);
            }
            None => skipped.push(skip(FragmentKind::Podcast, EmbedSkip::NoPodcast)),
        }

        let content = head
            .into_iter()
            .chain(std::iter::once(body))
            .chain(tail)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        publisher.update(post_id, &content).await?;

        let digest = document_digest(&content);
        let now = self.clock.now();

        tracing::info!(
            item_id = %item.id,
            post_id,
            embedded = ?embedded,
            skipped = skipped.len(),
            digest = %digest,
            "Embedded media into blog post"
        );

        blog.schema_json = Some(schema.to_string());
        blog.updated_at = now;
        self.store.save_blog_post(&blog).await?;

        let mut patch = ItemPatch {
            schema_generated: Some(true),
            last_embedded_at: Some(now),
            ..Default::default()
        };
        if embedded.contains(&FragmentKind::ShortVideo) {
            patch.short_video_added_at = Some(now);
        }
        if embedded.contains(&FragmentKind::LongVideo) {
            patch.long_video_added_at = Some(now);
        }
        if embedded.contains(&FragmentKind::Podcast) {
            patch.podcast_added_at = Some(now);
        }
        self.store.update_item(item.id, &patch).await?;

        Ok(EmbedReport {
            item_id: item.id,
            embedded,
            skipped,
            map_preserved,
            digest,
        })
    }
}

fn skip(kind: FragmentKind, reason: EmbedSkip) -> SkippedFragment {
    SkippedFragment {
        kind,
        reason,
        message: reason.message().to_string(),
    }
}
