//! GetLate social scheduling adapter

use async_trait::async_trait;
use paa_pipeline_domain::{
    AdapterError, ScheduledPost, SocialMedia, SocialPlatform, SocialPostRequest, SocialScheduler,
    SocialStatus,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;

use crate::http::{self, DEFAULT_TIMEOUT};

const DEFAULT_BASE_URL: &str = "https://getlate.dev/api";

/// Schedules posts through GetLate on one set of connected accounts.
///
/// Each platform must have a connected account id; scheduling to a platform
/// without one is reported as `NotConfigured`.
pub struct GetLateScheduler {
    client: Client,
    api_key: SecretString,
    base_url: String,
    accounts: BTreeMap<SocialPlatform, String>,
    timeout: Duration,
}

impl GetLateScheduler {
    pub fn new(api_key: SecretString, accounts: BTreeMap<SocialPlatform, String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), accounts)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        accounts: BTreeMap<SocialPlatform, String>,
    ) -> Self {
        Self {
            client: http::build_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            accounts,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Platforms with a connected account
    pub fn platforms(&self) -> Vec<SocialPlatform> {
        self.accounts.keys().copied().collect()
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }
}

fn platform_name(platform: SocialPlatform) -> &'static str {
    match platform {
        SocialPlatform::GoogleBusiness => "googlebusiness",
        other => other.as_str(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    content: String,
    platforms: Vec<PlatformTarget>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    media_items: Vec<MediaItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_for: Option<String>,
    publish_now: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlatformTarget {
    platform: &'static str,
    account_id: String,
}

#[derive(Serialize)]
struct MediaItem {
    r#type: &'static str,
    url: String,
}

#[derive(Deserialize)]
struct PostEnvelope {
    post: PostBody,
}

#[derive(Deserialize)]
struct PostBody {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    platforms: Vec<PlatformResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformResult {
    #[serde(default)]
    platform_post_url: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[async_trait]
impl SocialScheduler for GetLateScheduler {
    async fn schedule(&self, post: &SocialPostRequest) -> Result<ScheduledPost, AdapterError> {
        let account_id = self.accounts.get(&post.platform).ok_or_else(|| {
            AdapterError::NotConfigured(format!("GetLate account for {}", post.platform))
        })?;

        let content = match &post.link_url {
            Some(link) if !post.caption.contains(link.as_str()) => {
                format!("{}\n\n{}", post.caption, link)
            }
            _ => post.caption.clone(),
        };
        let media_type = match post.media {
            SocialMedia::Image => "image",
            SocialMedia::ShortVideo => "video",
        };
        let scheduled_for = post
            .scheduled_for
            .map(|at| at.format(&Rfc3339))
            .transpose()
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        let request = CreatePostRequest {
            content,
            platforms: vec![PlatformTarget {
                platform: platform_name(post.platform),
                account_id: account_id.clone(),
            }],
            media_items: post
                .media_url
                .iter()
                .map(|url| MediaItem {
                    r#type: media_type,
                    url: url.clone(),
                })
                .collect(),
            publish_now: scheduled_for.is_none(),
            scheduled_for,
        };

        let response = self
            .client
            .post(format!("{}/v1/posts", self.base_url))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let envelope: PostEnvelope = http::json(http::check(response, "GetLate").await?).await?;

        tracing::info!(
            platform = %post.platform,
            provider_id = %envelope.post.id,
            "Scheduled social post"
        );
        Ok(ScheduledPost {
            provider_id: envelope.post.id,
        })
    }

    async fn check_status(&self, provider_id: &str) -> Result<SocialStatus, AdapterError> {
        let response = self
            .client
            .get(format!("{}/v1/posts/{}", self.base_url, provider_id))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let envelope: PostEnvelope = http::json(http::check(response, "GetLate").await?).await?;
        let post = envelope.post;

        Ok(match post.status.as_deref() {
            Some("published") => SocialStatus::Published {
                url: post
                    .platforms
                    .iter()
                    .find_map(|p| p.platform_post_url.clone())
                    .unwrap_or_else(|| format!("https://getlate.dev/posts/{}", post.id)),
            },
            Some("failed") => SocialStatus::Failed {
                error: post
                    .platforms
                    .iter()
                    .find_map(|p| p.error_message.clone())
                    .unwrap_or_else(|| "GetLate reported the post as failed".to_string()),
            },
            _ => SocialStatus::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scheduler(server: &MockServer) -> GetLateScheduler {
        GetLateScheduler::with_base_url(
            SecretString::new("late-key".into()),
            server.uri(),
            BTreeMap::from([
                (SocialPlatform::Facebook, "acc-fb".to_string()),
                (SocialPlatform::Youtube, "acc-yt".to_string()),
            ]),
        )
    }

    fn image_post() -> SocialPostRequest {
        SocialPostRequest {
            platform: SocialPlatform::Facebook,
            caption: "Chipped windshield? Here's what to do.".to_string(),
            media: SocialMedia::Image,
            media_url: Some("https://img.test/1.png".to_string()),
            link_url: Some("https://acme.test/blog/chips".to_string()),
            scheduled_for: None,
        }
    }

    #[tokio::test]
    async fn test_schedule_image_post() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/posts"))
            .and(header("Authorization", "Bearer late-key"))
            .and(body_json(serde_json::json!({
                "content": "Chipped windshield? Here's what to do.\n\nhttps://acme.test/blog/chips",
                "platforms": [{ "platform": "facebook", "accountId": "acc-fb" }],
                "mediaItems": [{ "type": "image", "url": "https://img.test/1.png" }],
                "publishNow": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "post": { "_id": "late-123", "status": "scheduled" }
            })))
            .mount(&server)
            .await;

        let scheduled = scheduler(&server).schedule(&image_post()).await.unwrap();

        assert_eq!(scheduled.provider_id, "late-123");
    }

    #[tokio::test]
    async fn test_schedule_for_later() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/posts"))
            .and(body_json(serde_json::json!({
                "content": "Watch this",
                "platforms": [{ "platform": "youtube", "accountId": "acc-yt" }],
                "mediaItems": [{ "type": "video", "url": "https://cdn.test/short.mp4" }],
                "scheduledFor": "2026-03-05T09:00:00Z",
                "publishNow": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "post": { "_id": "late-456" }
            })))
            .mount(&server)
            .await;

        let request = SocialPostRequest {
            platform: SocialPlatform::Youtube,
            caption: "Watch this".to_string(),
            media: SocialMedia::ShortVideo,
            media_url: Some("https://cdn.test/short.mp4".to_string()),
            link_url: None,
            scheduled_for: Some(datetime!(2026-03-05 09:00 UTC)),
        };
        let scheduled = scheduler(&server).schedule(&request).await.unwrap();

        assert_eq!(scheduled.provider_id, "late-456");
    }

    #[tokio::test]
    async fn test_platform_without_account_is_not_configured() {
        let server = MockServer::start().await;
        let mut request = image_post();
        request.platform = SocialPlatform::Tiktok;

        let result = scheduler(&server).schedule(&request).await;

        assert!(matches!(result, Err(AdapterError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/posts/pub"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post": {
                    "_id": "pub",
                    "status": "published",
                    "platforms": [{ "platformPostUrl": "https://facebook.com/acme/posts/1" }]
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/posts/nourl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post": { "_id": "nourl", "status": "published", "platforms": [{}] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/posts/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post": { "_id": "bad", "status": "failed", "platforms": [] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/posts/wait"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post": { "_id": "wait", "status": "publishing" }
            })))
            .mount(&server)
            .await;

        let scheduler = scheduler(&server);

        assert_eq!(
            scheduler.check_status("pub").await.unwrap(),
            SocialStatus::Published {
                url: "https://facebook.com/acme/posts/1".to_string()
            }
        );
        assert_eq!(
            scheduler.check_status("nourl").await.unwrap(),
            SocialStatus::Published {
                url: "https://getlate.dev/posts/nourl".to_string()
            }
        );
        assert!(matches!(
            scheduler.check_status("bad").await.unwrap(),
            SocialStatus::Failed { error } if !error.is_empty()
        ));
        assert_eq!(
            scheduler.check_status("wait").await.unwrap(),
            SocialStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/posts/any"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = scheduler(&server).check_status("any").await;

        assert!(matches!(result, Err(AdapterError::RateLimited)));
    }
}
