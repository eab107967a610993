//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Error returned when a stored enum value cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lifecycle status of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Scheduled,
    Generating,
    Review,
    Approved,
    Published,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Generating => "generating",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    /// Whether an item in this status may be removed
    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::Scheduled | Self::Generating | Self::Failed
        )
    }
}

impl FromStr for ContentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "generating" => Ok(Self::Generating),
            "review" => Ok(Self::Review),
            "approved" => Ok(Self::Approved),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError::new("content status", other)),
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A city/area a client serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLocation {
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
}

impl ServiceLocation {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            neighborhood: None,
        }
    }

    /// Human-readable label, e.g. "Ballard, Seattle, WA"
    pub fn label(&self) -> String {
        match &self.neighborhood {
            Some(n) => format!("{}, {}, {}", n, self.city, self.state),
            None => format!("{}, {}", self.city, self.state),
        }
    }

    /// Case-insensitive key used for schedule deduplication
    pub fn key(&self) -> String {
        self.label().to_lowercase()
    }
}

/// Pipeline stages in their fixed execution order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Blog,
    Podcast,
    Images,
    Social,
    Video,
    Schema,
    Embed,
}

impl StageKind {
    pub const ORDER: [StageKind; 7] = [
        StageKind::Blog,
        StageKind::Podcast,
        StageKind::Images,
        StageKind::Social,
        StageKind::Video,
        StageKind::Schema,
        StageKind::Embed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Podcast => "podcast",
            Self::Images => "images",
            Self::Social => "social",
            Self::Video => "video",
            Self::Schema => "schema",
            Self::Embed => "embed",
        }
    }
}

impl FromStr for StageKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("stage", s))
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage "generated" flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    pub blog_generated: bool,
    pub images_generated: bool,
    pub social_generated: bool,
    pub podcast_generated: bool,
    pub short_video_generated: bool,
    pub schema_generated: bool,
}

/// When each media kind was last written into the published post.
///
/// Independent of the generated flags: a podcast can be generated long before
/// its player lands in the blog post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMarks {
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub podcast_added_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub short_video_added_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub long_video_added_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_embedded_at: Option<OffsetDateTime>,
}

impl EmbedMarks {
    pub fn podcast_added_to_post(&self) -> bool {
        self.podcast_added_at.is_some()
    }

    pub fn short_video_added_to_post(&self) -> bool {
        self.short_video_added_at.is_some()
    }

    pub fn long_video_added_to_post(&self) -> bool {
        self.long_video_added_at.is_some()
    }
}

/// Identifiers handed back by external systems
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRefs {
    pub wordpress_post_id: Option<u64>,
    pub wordpress_url: Option<String>,
    pub podbean_episode_id: Option<String>,
    pub podbean_url: Option<String>,
    pub podbean_player_url: Option<String>,
    pub short_video_job_id: Option<String>,
    pub long_video_url: Option<String>,
    /// Provider post ids keyed by `owner:platform`
    #[serde(default)]
    pub social_post_ids: BTreeMap<String, String>,
}

/// Classification of a recorded stage issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The client has no credentials for the service; reported, not alarming
    NotConfigured,
    /// An adapter call failed
    Failed,
    /// Work is waiting on something external (e.g. an unpublished video)
    Pending,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for IssueKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_configured" => Ok(Self::NotConfigured),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            other => Err(ParseEnumError::new("issue kind", other)),
        }
    }
}

/// Last non-success outcome recorded for a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl StageIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>, recorded_at: OffsetDateTime) -> Self {
        Self {
            kind,
            message: message.into(),
            recorded_at,
        }
    }

    pub fn requires_attention(&self) -> bool {
        matches!(self.kind, IssueKind::Failed | IssueKind::Pending)
    }
}

/// Aggregate root: one scheduled PAA question for one client location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub client_id: String,
    pub paa_question: String,
    pub location: ServiceLocation,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub status: ContentStatus,
    pub flags: StageFlags,
    pub embeds: EmbedMarks,
    pub refs: ExternalRefs,
    #[serde(default)]
    pub issues: BTreeMap<StageKind, StageIssue>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ContentItem {
    /// Create a new item in `Scheduled` status
    pub fn scheduled(
        client_id: impl Into<String>,
        paa_question: impl Into<String>,
        location: ServiceLocation,
        scheduled_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            paa_question: paa_question.into(),
            location,
            scheduled_at,
            status: ContentStatus::Scheduled,
            flags: StageFlags::default(),
            embeds: EmbedMarks::default(),
            refs: ExternalRefs::default(),
            issues: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when any stage failed or is waiting on something a human should check
    pub fn needs_attention(&self) -> bool {
        self.issues.values().any(StageIssue::requires_attention)
    }

    /// Schema and embed have both run at least once
    pub fn is_finalized(&self) -> bool {
        self.flags.schema_generated && self.embeds.last_embedded_at.is_some()
    }

    pub fn blog_published(&self) -> bool {
        self.refs.wordpress_post_id.is_some()
    }

    /// Key identifying the (client, question, location) combination
    pub fn topic_key(&self) -> (String, String, String) {
        topic_key(&self.client_id, &self.paa_question, &self.location)
    }
}

pub fn topic_key(
    client_id: &str,
    question: &str,
    location: &ServiceLocation,
) -> (String, String, String) {
    (
        client_id.to_string(),
        question.trim().to_lowercase(),
        location.key(),
    )
}

/// Narrow, additive update to a content item.
///
/// Only fields set to `Some` are written; everything else on the stored record
/// is left as it is. Stores apply these column-by-column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub status: Option<ContentStatus>,
    pub blog_generated: Option<bool>,
    pub images_generated: Option<bool>,
    pub social_generated: Option<bool>,
    pub podcast_generated: Option<bool>,
    pub short_video_generated: Option<bool>,
    pub schema_generated: Option<bool>,
    pub wordpress_post_id: Option<u64>,
    pub wordpress_url: Option<String>,
    pub podbean_episode_id: Option<String>,
    pub podbean_url: Option<String>,
    pub podbean_player_url: Option<String>,
    pub short_video_job_id: Option<String>,
    pub long_video_url: Option<String>,
    pub social_post_ids: Vec<(String, String)>,
    pub podcast_added_at: Option<OffsetDateTime>,
    pub short_video_added_at: Option<OffsetDateTime>,
    pub long_video_added_at: Option<OffsetDateTime>,
    pub last_embedded_at: Option<OffsetDateTime>,
    pub set_issues: Vec<(StageKind, StageIssue)>,
    pub clear_issues: Vec<StageKind>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ContentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn issue(mut self, stage: StageKind, issue: StageIssue) -> Self {
        self.clear_issues.retain(|s| *s != stage);
        self.set_issues.push((stage, issue));
        self
    }

    pub fn clear_issue(mut self, stage: StageKind) -> Self {
        self.set_issues.retain(|(s, _)| *s != stage);
        self.clear_issues.push(stage);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to an in-memory record
    pub fn apply_to(&self, item: &mut ContentItem, now: OffsetDateTime) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut item.status, &self.status);
        set(&mut item.flags.blog_generated, &self.blog_generated);
        set(&mut item.flags.images_generated, &self.images_generated);
        set(&mut item.flags.social_generated, &self.social_generated);
        set(&mut item.flags.podcast_generated, &self.podcast_generated);
        set(
            &mut item.flags.short_video_generated,
            &self.short_video_generated,
        );
        set(&mut item.flags.schema_generated, &self.schema_generated);
        set_opt(&mut item.refs.wordpress_post_id, &self.wordpress_post_id);
        set_opt(&mut item.refs.wordpress_url, &self.wordpress_url);
        set_opt(&mut item.refs.podbean_episode_id, &self.podbean_episode_id);
        set_opt(&mut item.refs.podbean_url, &self.podbean_url);
        set_opt(&mut item.refs.podbean_player_url, &self.podbean_player_url);
        set_opt(&mut item.refs.short_video_job_id, &self.short_video_job_id);
        set_opt(&mut item.refs.long_video_url, &self.long_video_url);
        for (key, id) in &self.social_post_ids {
            item.refs.social_post_ids.insert(key.clone(), id.clone());
        }
        set_opt(&mut item.embeds.podcast_added_at, &self.podcast_added_at);
        set_opt(
            &mut item.embeds.short_video_added_at,
            &self.short_video_added_at,
        );
        set_opt(
            &mut item.embeds.long_video_added_at,
            &self.long_video_added_at,
        );
        set_opt(&mut item.embeds.last_embedded_at, &self.last_embedded_at);
        for stage in &self.clear_issues {
            item.issues.remove(stage);
        }
        for (stage, issue) in &self.set_issues {
            item.issues.insert(*stage, issue.clone());
        }
        item.updated_at = now;
    }
}

/// Filter for listing content items
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub client_id: Option<String>,
    pub status: Option<ContentStatus>,
    /// Only items scheduled at or before this instant
    pub due_before: Option<OffsetDateTime>,
}

impl ItemFilter {
    pub fn matches(&self, item: &ContentItem) -> bool {
        if let Some(client_id) = &self.client_id {
            if &item.client_id != client_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if item.status != status {
                return false;
            }
        }
        if let Some(due) = self.due_before {
            if item.scheduled_at > due {
                return false;
            }
        }
        true
    }
}

/// Social platforms reachable through the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    Linkedin,
    GoogleBusiness,
    Twitter,
    Threads,
    Bluesky,
    Pinterest,
    Youtube,
    Tiktok,
}

impl SocialPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Linkedin => "linkedin",
            Self::GoogleBusiness => "google_business",
            Self::Twitter => "twitter",
            Self::Threads => "threads",
            Self::Bluesky => "bluesky",
            Self::Pinterest => "pinterest",
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
        }
    }

    /// Platforms that only accept video, so they wait for the short video
    pub fn is_video_only(&self) -> bool {
        matches!(self, Self::Youtube | Self::Tiktok)
    }
}

impl FromStr for SocialPlatform {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facebook" => Ok(Self::Facebook),
            "instagram" => Ok(Self::Instagram),
            "linkedin" => Ok(Self::Linkedin),
            "google_business" => Ok(Self::GoogleBusiness),
            "twitter" => Ok(Self::Twitter),
            "threads" => Ok(Self::Threads),
            "bluesky" => Ok(Self::Bluesky),
            "pinterest" => Ok(Self::Pinterest),
            "youtube" => Ok(Self::Youtube),
            "tiktok" => Ok(Self::Tiktok),
            other => Err(ParseEnumError::new("social platform", other)),
        }
    }
}

impl fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whose account a social post goes out on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOwner {
    /// The client's own accounts
    Client,
    /// The WRHQ directory accounts
    Directory,
}

impl PostOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Directory => "directory",
        }
    }
}

impl FromStr for PostOwner {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "directory" => Ok(Self::Directory),
            other => Err(ParseEnumError::new("post owner", other)),
        }
    }
}

/// Media attached to a social post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialMedia {
    Image,
    ShortVideo,
}

impl SocialMedia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::ShortVideo => "short_video",
        }
    }
}

impl FromStr for SocialMedia {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "short_video" => Ok(Self::ShortVideo),
            other => Err(ParseEnumError::new("social media", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPostStatus {
    Scheduled,
    Processing,
    Published,
    Failed,
}

impl SocialPostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }
}

impl FromStr for SocialPostStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "processing" => Ok(Self::Processing),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError::new("social post status", other)),
        }
    }
}

/// Rejected state transition on a child record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot move {record} from {from} to {to}")]
pub struct TransitionError {
    pub record: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// One social post for one platform and owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: Uuid,
    pub item_id: Uuid,
    pub owner: PostOwner,
    pub platform: SocialPlatform,
    pub media: SocialMedia,
    pub status: SocialPostStatus,
    pub caption: String,
    pub provider_post_id: Option<String>,
    pub published_url: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SocialPost {
    pub fn scheduled(
        item_id: Uuid,
        owner: PostOwner,
        platform: SocialPlatform,
        media: SocialMedia,
        caption: impl Into<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            owner,
            platform,
            media,
            status: SocialPostStatus::Scheduled,
            caption: caption.into(),
            provider_post_id: None,
            published_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Key under which the provider id is mirrored on the content item
    pub fn ref_key(&self) -> String {
        format!("{}:{}", self.owner.as_str(), self.platform.as_str())
    }

    fn transition(
        &mut self,
        to: SocialPostStatus,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError {
                record: "social post",
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Accepted by the provider; a provider id is mandatory in this state
    pub fn mark_processing(
        &mut self,
        provider_post_id: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(SocialPostStatus::Processing, now)?;
        self.provider_post_id = Some(provider_post_id.into());
        Ok(())
    }

    pub fn mark_published(
        &mut self,
        url: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(SocialPostStatus::Published, now)?;
        self.published_url = Some(url.into());
        self.error_message = None;
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(SocialPostStatus::Failed, now)?;
        self.error_message = Some(error.into());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    Short,
    Long,
}

impl VideoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

impl FromStr for VideoKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            other => Err(ParseEnumError::new("video kind", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Processing,
    Ready,
    Published,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl FromStr for VideoStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError::new("video status", other)),
        }
    }
}

/// A rendered or uploaded video for a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub item_id: Uuid,
    pub kind: VideoKind,
    pub status: VideoStatus,
    pub provider_job_id: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<u32>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Video {
    /// A submitted render job awaiting completion
    pub fn processing(
        item_id: Uuid,
        kind: VideoKind,
        job_id: impl Into<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            kind,
            status: VideoStatus::Processing,
            provider_job_id: Some(job_id.into()),
            video_url: None,
            thumbnail_url: None,
            duration_secs: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A video that is already hosted somewhere public
    pub fn published(
        item_id: Uuid,
        kind: VideoKind,
        url: impl Into<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            kind,
            status: VideoStatus::Published,
            provider_job_id: None,
            video_url: Some(url.into()),
            thumbnail_url: None,
            duration_secs: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, to: VideoStatus, now: OffsetDateTime) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError {
                record: "video",
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_ready(
        &mut self,
        video_url: impl Into<String>,
        thumbnail_url: Option<String>,
        duration_secs: Option<u32>,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(VideoStatus::Ready, now)?;
        self.video_url = Some(video_url.into());
        self.thumbnail_url = thumbnail_url;
        self.duration_secs = duration_secs;
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(VideoStatus::Failed, now)?;
        self.error_message = Some(error.into());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodcastStatus {
    /// Audio exists but the episode is not yet on Podbean
    Ready,
    Published,
    Failed,
}

impl PodcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Published | Self::Failed)
    }
}

impl FromStr for PodcastStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError::new("podcast status", other)),
        }
    }
}

/// Podcast episode for a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub item_id: Uuid,
    pub status: PodcastStatus,
    pub title: String,
    pub description: String,
    pub audio_url: Option<String>,
    pub duration_secs: Option<u32>,
    pub episode_id: Option<String>,
    pub episode_url: Option<String>,
    pub player_url: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Generated blog post for a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub item_id: Uuid,
    pub title: String,
    pub slug: String,
    pub html: String,
    pub excerpt: String,
    pub meta_description: String,
    pub wordpress_post_id: Option<u64>,
    pub wordpress_url: Option<String>,
    /// Most recently generated JSON-LD document
    pub schema_json: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Generated,
    Photo,
}

impl ImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Photo => "photo",
        }
    }
}

impl FromStr for ImageSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "photo" => Ok(Self::Photo),
            other => Err(ParseEnumError::new("image source", other)),
        }
    }
}

/// Image attached to a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentImage {
    pub id: Uuid,
    pub item_id: Uuid,
    pub url: String,
    pub alt_text: String,
    pub source: ImageSource,
    pub featured: bool,
}

/// Business profile of a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: String,
    pub name: String,
    pub website: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street_address: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Google Maps embed URL inserted with the first publish
    #[serde(default)]
    pub map_embed_url: Option<String>,
    /// Photo account used for real shop photos
    #[serde(default)]
    pub photo_account: Option<String>,
    #[serde(default)]
    pub social_platforms: Vec<SocialPlatform>,
    #[serde(default)]
    pub paa_questions: Vec<String>,
    #[serde(default)]
    pub locations: Vec<ServiceLocation>,
}
