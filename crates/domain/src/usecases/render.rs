//! Rendering of the HTML fragments layered onto a published blog post

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of fragment the embed composer manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    Schema,
    ShortVideo,
    LongVideo,
    Podcast,
    Map,
}

impl FragmentKind {
    /// Kinds that are stripped and rebuilt on every composition.
    /// The map is left alone once the first publish has placed it.
    pub const REBUILT: [FragmentKind; 4] = [
        FragmentKind::Schema,
        FragmentKind::ShortVideo,
        FragmentKind::LongVideo,
        FragmentKind::Podcast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::ShortVideo => "short-video",
            Self::LongVideo => "long-video",
            Self::Podcast => "podcast",
            Self::Map => "map",
        }
    }

    pub fn start_marker(&self) -> String {
        format!("<!-- paa:{}:start -->", self.as_str())
    }

    pub fn end_marker(&self) -> String {
        format!("<!-- paa:{}:end -->", self.as_str())
    }

    /// Surround `html` with this kind's markers
    pub fn wrap(&self, html: &str) -> String {
        format!("{}\n{}\n{}", self.start_marker(), html, self.end_marker())
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the fragment renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Width of the floated vertical video
    pub short_video_width_px: u32,
    /// Height of the podcast player iframe
    pub podcast_player_height_px: u32,
    /// Height of the map iframe
    pub map_height_px: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            short_video_width_px: 315,
            podcast_player_height_px: 150,
            map_height_px: 400,
        }
    }
}

/// Renderer for media fragments
pub struct Renderer {
    config: RenderConfig,
    youtube_id: Regex,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let youtube_id = Regex::new(
            r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/|embed/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})",
        )
        .expect("Valid regex");
        Self { config, youtube_id }
    }

    /// Extract the 11-character id from any common YouTube URL shape
    pub fn youtube_video_id(&self, url: &str) -> Option<String> {
        self.youtube_id
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// JSON-LD script block, marker-wrapped
    pub fn schema(&self, schema: &serde_json::Value) -> String {
        // `</` inside a script element would terminate it early
        let json = schema.to_string().replace("</", "<\\/");
        FragmentKind::Schema.wrap(&format!(
            "<script type=\"application/ld+json\">{}</script>",
            json
        ))
    }

    /// Vertical video floated right so the article text wraps around it
    pub fn short_video(&self, url: &str, title: &str) -> String {
        let player = self.player(url, title, "9 / 16");
        FragmentKind::ShortVideo.wrap(&format!(
            "<div class=\"paa-short-video\" style=\"float:right;width:{}px;max-width:45%;margin:0 0 1em 1.5em;\">{}</div>",
            self.config.short_video_width_px, player
        ))
    }

    /// Full-width horizontal video
    pub fn long_video(&self, url: &str, title: &str) -> String {
        let player = self.player(url, title, "16 / 9");
        FragmentKind::LongVideo.wrap(&format!(
            "<div class=\"paa-long-video\" style=\"clear:both;width:100%;margin:2em 0;\">{}</div>",
            player
        ))
    }

    pub fn podcast(&self, player_url: &str, title: &str) -> String {
        FragmentKind::Podcast.wrap(&format!(
            "<div class=\"paa-podcast\" style=\"clear:both;margin:2em 0;\"><iframe title=\"{}\" src=\"{}\" height=\"{}\" width=\"100%\" style=\"border:none;\" loading=\"lazy\" scrolling=\"no\"></iframe></div>",
            escape_attr(title),
            escape_attr(player_url),
            self.config.podcast_player_height_px
        ))
    }

    pub fn map(&self, embed_url: &str, label: &str) -> String {
        FragmentKind::Map.wrap(&format!(
            "<div class=\"paa-map\" style=\"clear:both;margin:2em 0;\"><iframe title=\"Map of {}\" src=\"{}\" width=\"100%\" height=\"{}\" style=\"border:0;\" allowfullscreen loading=\"lazy\" referrerpolicy=\"no-referrer-when-downgrade\"></iframe></div>",
            escape_attr(label),
            escape_attr(embed_url),
            self.config.map_height_px
        ))
    }

    fn player(&self, url: &str, title: &str, aspect: &str) -> String {
        match self.youtube_video_id(url) {
            Some(id) => format!(
                "<iframe title=\"{}\" src=\"https://www.youtube.com/embed/{}\" style=\"width:100%;aspect-ratio:{};border:0;\" allow=\"accelerometer; encrypted-media; gyroscope; picture-in-picture\" allowfullscreen loading=\"lazy\"></iframe>",
                escape_attr(title),
                id,
                aspect
            ),
            None => format!(
                "<video controls preload=\"metadata\" src=\"{}\" style=\"width:100%;aspect-ratio:{};\"></video>",
                escape_attr(url),
                aspect
            ),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
