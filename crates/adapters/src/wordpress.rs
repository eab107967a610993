//! WordPress REST API adapter

use async_trait::async_trait;
use paa_pipeline_domain::{AdapterError, BlogDocument, BlogDraft, BlogPublisher, PublishedBlog};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::{self, DEFAULT_TIMEOUT};

/// Publishes and rewrites posts on a client's WordPress site using an
/// application password.
pub struct WordPressPublisher {
    client: Client,
    site_url: String,
    username: String,
    app_password: SecretString,
    timeout: Duration,
}

impl WordPressPublisher {
    pub fn new(
        site_url: impl Into<String>,
        username: impl Into<String>,
        app_password: SecretString,
    ) -> Self {
        Self::with_timeout(site_url, username, app_password, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        site_url: impl Into<String>,
        username: impl Into<String>,
        app_password: SecretString,
        timeout: Duration,
    ) -> Self {
        Self {
            client: http::build_client(timeout),
            site_url: site_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            app_password,
            timeout,
        }
    }

    fn posts_url(&self) -> String {
        format!("{}/wp-json/wp/v2/posts", self.site_url)
    }
}

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    title: &'a str,
    slug: &'a str,
    content: &'a str,
    excerpt: &'a str,
    status: &'static str,
}

#[derive(Serialize)]
struct UpdatePostRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PostResponse {
    id: u64,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    content: Option<RenderedField>,
}

#[derive(Deserialize)]
struct RenderedField {
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    rendered: Option<String>,
}

#[async_trait]
impl BlogPublisher for WordPressPublisher {
    async fn publish(&self, draft: &BlogDraft) -> Result<PublishedBlog, AdapterError> {
        let request = CreatePostRequest {
            title: &draft.title,
            slug: &draft.slug,
            content: &draft.html,
            excerpt: &draft.excerpt,
            status: "publish",
        };

        let response = self
            .client
            .post(self.posts_url())
            .basic_auth(&self.username, Some(self.app_password.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let post: PostResponse = http::json(http::check(response, "WordPress").await?).await?;

        let url = post
            .link
            .unwrap_or_else(|| format!("{}/?p={}", self.site_url, post.id));
        tracing::info!(post_id = post.id, url = %url, "Published WordPress post");

        Ok(PublishedBlog {
            post_id: post.id,
            url,
        })
    }

    async fn fetch(&self, post_id: u64) -> Result<BlogDocument, AdapterError> {
        let response = self
            .client
            .get(format!("{}/{}?context=edit", self.posts_url(), post_id))
            .basic_auth(&self.username, Some(self.app_password.expose_secret()))
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let post: PostResponse = http::json(http::check(response, "WordPress").await?).await?;

        // `raw` is only present in the edit context; fall back to the rendered body
        let content = post
            .content
            .and_then(|c| c.raw.or(c.rendered))
            .ok_or_else(|| {
                AdapterError::InvalidResponse(format!("post {} has no content field", post_id))
            })?;

        Ok(BlogDocument { post_id, content })
    }

    async fn update(&self, post_id: u64, content: &str) -> Result<(), AdapterError> {
        let response = self
            .client
            .post(format!("{}/{}", self.posts_url(), post_id))
            .basic_auth(&self.username, Some(self.app_password.expose_secret()))
            .json(&UpdatePostRequest { content })
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        http::check(response, "WordPress").await?;

        tracing::debug!(post_id, bytes = content.len(), "Updated WordPress post");
        Ok(())
    }
}
