//! HTTP client for the content-generation service

use async_trait::async_trait;
use paa_pipeline_domain::{
    AdapterError, BlogDraft, BlogRequest, CaptionRequest, ContentGenerator, GeneratedImage,
    ImageRequest, PodcastAudio, PodcastRequest, SocialCaption, SocialPlatform,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http;

/// Settings for the generation service client
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Request timeout in seconds; generation calls are slow
    pub timeout_secs: u64,
    /// Number of retries on transient failure
    pub retries: u32,
    /// Base delay before the first retry, doubled on each attempt
    pub backoff_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            retries: 2,
            backoff_ms: 500,
        }
    }
}

/// Drives blog, image, caption and narration generation over JSON/HTTP
pub struct HttpContentGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: GeneratorConfig,
}

impl HttpContentGenerator {
    pub fn new(api_key: SecretString, base_url: String, config: GeneratorConfig) -> Self {
        Self {
            client: http::build_client(Duration::from_secs(config.timeout_secs)),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    async fn call_once<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, AdapterError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(body)
            .send()
            .await
            .map_err(|e| http::send_error(e, Duration::from_secs(self.config.timeout_secs)))?;
        http::json(http::check(response, "content generator").await?).await
    }

    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, AdapterError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let mut last_error = None;
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                tracing::warn!(attempt, path, "Retrying generation call");
                tokio::time::sleep(Duration::from_millis(
                    self.config.backoff_ms * 2_u64.pow(attempt),
                ))
                .await;
            }

            match self.call_once(path, body).await {
                Ok(response) => return Ok(response),
                Err(e @ (AdapterError::Auth(_) | AdapterError::RateLimited)) => return Err(e),
                Err(AdapterError::Api { status, message }) if status < 500 => {
                    return Err(AdapterError::Api { status, message });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| AdapterError::Network("no attempt was made".to_string())))
    }
}

#[derive(Serialize)]
struct BlogBody<'a> {
    client_name: &'a str,
    website: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    question: &'a str,
    location: &'a str,
}

#[derive(Deserialize)]
struct BlogResponse {
    title: String,
    slug: String,
    html: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    meta_description: String,
}

#[derive(Serialize)]
struct ImagesBody<'a> {
    question: &'a str,
    location: &'a str,
    count: usize,
}

#[derive(Deserialize)]
struct ImagesResponse {
    images: Vec<ImageBody>,
}

#[derive(Deserialize)]
struct ImageBody {
    url: String,
    #[serde(default)]
    alt_text: String,
}

#[derive(Serialize)]
struct CaptionsBody<'a> {
    client_name: &'a str,
    question: &'a str,
    location: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    blog_url: Option<&'a str>,
    platforms: &'a [SocialPlatform],
}

#[derive(Deserialize)]
struct CaptionsResponse {
    captions: Vec<CaptionBody>,
}

#[derive(Deserialize)]
struct CaptionBody {
    platform: SocialPlatform,
    text: String,
}

#[derive(Serialize)]
struct PodcastBody<'a> {
    client_name: &'a str,
    title: &'a str,
    blog_html: &'a str,
}

#[derive(Deserialize)]
struct PodcastResponse {
    audio_url: String,
    #[serde(default)]
    duration_secs: Option<u32>,
    title: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn write_blog(&self, request: &BlogRequest) -> Result<BlogDraft, AdapterError> {
        let blog: BlogResponse = self
            .call(
                "/v1/blog",
                &BlogBody {
                    client_name: &request.client_name,
                    website: &request.website,
                    phone: request.phone.as_deref(),
                    question: &request.question,
                    location: &request.location_label,
                },
            )
            .await?;

        if blog.html.trim().is_empty() {
            return Err(AdapterError::InvalidResponse(
                "generator returned an empty article".to_string(),
            ));
        }
        Ok(BlogDraft {
            title: blog.title,
            slug: blog.slug,
            html: blog.html,
            excerpt: blog.excerpt,
            meta_description: blog.meta_description,
        })
    }

    async fn create_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, AdapterError> {
        let response: ImagesResponse = self
            .call(
                "/v1/images",
                &ImagesBody {
                    question: &request.question,
                    location: &request.location_label,
                    count: request.count,
                },
            )
            .await?;

        Ok(response
            .images
            .into_iter()
            .take(request.count)
            .map(|image| GeneratedImage {
                url: image.url,
                alt_text: image.alt_text,
            })
            .collect())
    }

    async fn write_social_captions(
        &self,
        request: &CaptionRequest,
    ) -> Result<Vec<SocialCaption>, AdapterError> {
        let response: CaptionsResponse = self
            .call(
                "/v1/captions",
                &CaptionsBody {
                    client_name: &request.client_name,
                    question: &request.question,
                    location: &request.location_label,
                    blog_url: request.blog_url.as_deref(),
                    platforms: &request.platforms,
                },
            )
            .await?;

        Ok(response
            .captions
            .into_iter()
            .filter(|c| request.platforms.contains(&c.platform))
            .map(|c| SocialCaption {
                platform: c.platform,
                text: c.text,
            })
            .collect())
    }

    async fn narrate_podcast(
        &self,
        request: &PodcastRequest,
    ) -> Result<PodcastAudio, AdapterError> {
        let response: PodcastResponse = self
            .call(
                "/v1/podcast",
                &PodcastBody {
                    client_name: &request.client_name,
                    title: &request.title,
                    blog_html: &request.blog_html,
                },
            )
            .await?;

        Ok(PodcastAudio {
            audio_url: response.audio_url,
            duration_secs: response.duration_secs,
            title: response.title,
            description: response.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer, retries: u32) -> HttpContentGenerator {
        HttpContentGenerator::new(
            SecretString::new("gen-key".into()),
            server.uri(),
            GeneratorConfig {
                timeout_secs: 5,
                retries,
                backoff_ms: 1,
            },
        )
    }

    fn blog_request() -> BlogRequest {
        BlogRequest {
            client_name: "Acme Auto Glass".to_string(),
            website: "https://acme.test".to_string(),
            phone: None,
            question: "Can a chipped windshield be repaired?".to_string(),
            location_label: "Seattle, WA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_blog() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/blog"))
            .and(header("Authorization", "Bearer gen-key"))
            .and(body_json(serde_json::json!({
                "client_name": "Acme Auto Glass",
                "website": "https://acme.test",
                "question": "Can a chipped windshield be repaired?",
                "location": "Seattle, WA"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Can a chipped windshield be repaired?",
                "slug": "chipped-windshield-repair",
                "html": "<p>Usually, yes.</p>",
                "excerpt": "Usually, yes."
            })))
            .mount(&server)
            .await;

        let draft = generator(&server, 0)
            .write_blog(&blog_request())
            .await
            .unwrap();

        assert_eq!(draft.slug, "chipped-windshield-repair");
        assert_eq!(draft.meta_description, "");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/blog"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/blog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "t",
                "slug": "s",
                "html": "<p>ok</p>"
            })))
            .mount(&server)
            .await;

        let draft = generator(&server, 2)
            .write_blog(&blog_request())
            .await
            .unwrap();

        assert_eq!(draft.html, "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/blog"))
            .respond_with(ResponseTemplate::new(422).set_body_string("question too short"))
            .expect(1)
            .mount(&server)
            .await;

        let result = generator(&server, 3).write_blog(&blog_request()).await;

        assert!(matches!(result, Err(AdapterError::Api { status: 422, .. })));
    }

    #[tokio::test]
    async fn test_captions_are_limited_to_requested_platforms() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/captions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "captions": [
                    { "platform": "facebook", "text": "FB caption" },
                    { "platform": "tiktok", "text": "unrequested" }
                ]
            })))
            .mount(&server)
            .await;

        let captions = generator(&server, 0)
            .write_social_captions(&CaptionRequest {
                client_name: "Acme".to_string(),
                question: "q".to_string(),
                location_label: "Seattle, WA".to_string(),
                blog_url: Some("https://acme.test/blog/q".to_string()),
                platforms: vec![SocialPlatform::Facebook],
            })
            .await
            .unwrap();

        assert_eq!(
            captions,
            vec![SocialCaption {
                platform: SocialPlatform::Facebook,
                text: "FB caption".to_string(),
            }]
        );
    }
}
