//! Short-video rendering job API and YouTube long-form upload

use async_trait::async_trait;
use paa_pipeline_domain::{
    AdapterError, UploadedVideo, VideoJob, VideoJobRequest, VideoJobStatus, VideoMetadata,
    VideoProvider,
};
use reqwest::Client;
use reqwest::header::LOCATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::{self, DEFAULT_TIMEOUT};

/// Uploads can be large; allow them far longer than ordinary calls
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const YOUTUBE_API: &str = "https://www.googleapis.com";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Renders short videos through an external job API and, when YouTube
/// credentials are present, uploads long-form videos.
pub struct VideoApiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    uploader: Option<YouTubeUploader>,
    timeout: Duration,
}

impl VideoApiProvider {
    pub fn new(api_key: SecretString, base_url: String) -> Self {
        Self {
            client: http::build_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            uploader: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_uploader(mut self, uploader: YouTubeUploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }
}

#[derive(Serialize)]
struct CreateJobRequest<'a> {
    title: &'a str,
    script: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_url: Option<&'a str>,
    image_urls: &'a [String],
    aspect_ratio: &'a str,
}

#[derive(Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl VideoProvider for VideoApiProvider {
    async fn submit_job(&self, request: &VideoJobRequest) -> Result<VideoJob, AdapterError> {
        let body = CreateJobRequest {
            title: &request.title,
            script: &request.script,
            source_url: request.source_url.as_deref(),
            image_urls: &request.image_urls,
            aspect_ratio: &request.aspect_ratio,
        };

        let response = self
            .client
            .post(format!("{}/v1/videos", self.base_url))
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let job: JobResponse = http::json(http::check(response, "video API").await?).await?;

        tracing::info!(job_id = %job.id, "Submitted video job");
        Ok(VideoJob { job_id: job.id })
    }

    async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus, AdapterError> {
        let response = self
            .client
            .get(format!("{}/v1/videos/{}", self.base_url, job_id))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let job: JobResponse = http::json(http::check(response, "video API").await?).await?;

        match job.status.as_deref() {
            Some("completed") => {
                let video_url = job.video_url.ok_or_else(|| {
                    AdapterError::InvalidResponse(format!(
                        "job {} completed without a video URL",
                        job.id
                    ))
                })?;
                Ok(VideoJobStatus::Completed {
                    video_url,
                    thumbnail_url: job.thumbnail_url,
                    duration_secs: job.duration.map(|d| d.round() as u32),
                })
            }
            Some("failed") => Ok(VideoJobStatus::Failed {
                error: job
                    .error
                    .unwrap_or_else(|| "video rendering failed".to_string()),
            }),
            _ => Ok(VideoJobStatus::Processing),
        }
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        metadata: &VideoMetadata,
    ) -> Result<UploadedVideo, AdapterError> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| AdapterError::NotConfigured("YouTube upload".to_string()))?;
        uploader.upload(bytes, metadata).await
    }
}

/// Resumable uploads to YouTube with an OAuth refresh token
pub struct YouTubeUploader {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
    api_base: String,
    token_url: String,
}

impl YouTubeUploader {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        refresh_token: SecretString,
    ) -> Self {
        Self::with_endpoints(
            client_id,
            client_secret,
            refresh_token,
            YOUTUBE_API.to_string(),
            GOOGLE_TOKEN_URL.to_string(),
        )
    }

    pub fn with_endpoints(
        client_id: impl Into<String>,
        client_secret: SecretString,
        refresh_token: SecretString,
        api_base: String,
        token_url: String,
    ) -> Self {
        Self {
            client: http::build_client(UPLOAD_TIMEOUT),
            client_id: client_id.into(),
            client_secret,
            refresh_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url,
        }
    }

    async fn access_token(&self) -> Result<String, AdapterError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("refresh_token", self.refresh_token.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| http::send_error(e, DEFAULT_TIMEOUT))?;
        let token: TokenResponse = http::json(http::check(response, "Google OAuth").await?).await?;
        Ok(token.access_token)
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        metadata: &VideoMetadata,
    ) -> Result<UploadedVideo, AdapterError> {
        let token = self.access_token().await?;
        let body = UploadMetadata {
            snippet: Snippet {
                title: &metadata.title,
                description: &metadata.description,
                tags: &metadata.tags,
                category_id: "2",
            },
            status: UploadStatus {
                privacy_status: &metadata.privacy,
            },
        };

        let session = self
            .client
            .post(format!(
                "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
                self.api_base
            ))
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", bytes.len().to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error(e, UPLOAD_TIMEOUT))?;
        let session = http::check(session, "YouTube").await?;
        let location = session
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AdapterError::InvalidResponse("upload session has no Location header".to_string())
            })?;

        let size = bytes.len();
        let response = self
            .client
            .put(&location)
            .bearer_auth(&token)
            .header("Content-Type", "video/*")
            .body(bytes)
            .send()
            .await
            .map_err(|e| http::send_error(e, UPLOAD_TIMEOUT))?;
        let uploaded: UploadedResponse = http::json(http::check(response, "YouTube").await?).await?;

        tracing::info!(video_id = %uploaded.id, bytes = size, "Uploaded long-form video");
        Ok(UploadedVideo {
            url: format!("https://www.youtube.com/watch?v={}", uploaded.id),
            video_id: uploaded.id,
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct UploadMetadata<'a> {
    snippet: Snippet<'a>,
    status: UploadStatus<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
    category_id: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadStatus<'a> {
    privacy_status: &'a str,
}

#[derive(Deserialize)]
struct UploadedResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> VideoApiProvider {
        VideoApiProvider::new(SecretString::new("video-key".into()), server.uri())
    }

    #[tokio::test]
    async fn test_submit_job() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .and(header("Authorization", "Bearer video-key"))
            .and(body_json(serde_json::json!({
                "title": "Chip repair",
                "script": "Chips spread in the cold.",
                "image_urls": ["https://img.test/1.png"],
                "aspect_ratio": "9:16"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "id": "vid-77",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        let job = provider(&server)
            .submit_job(&VideoJobRequest {
                title: "Chip repair".to_string(),
                script: "Chips spread in the cold.".to_string(),
                source_url: None,
                image_urls: vec!["https://img.test/1.png".to_string()],
                aspect_ratio: "9:16".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(job.job_id, "vid-77");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/videos/done"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "done",
                "status": "completed",
                "video_url": "https://cdn.test/done.mp4",
                "thumbnail_url": "https://cdn.test/done.jpg",
                "duration": 41.6
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/videos/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "broken",
                "status": "failed",
                "error": "script too long"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/videos/busy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "busy",
                "status": "rendering"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);

        assert_eq!(
            provider.check_status("done").await.unwrap(),
            VideoJobStatus::Completed {
                video_url: "https://cdn.test/done.mp4".to_string(),
                thumbnail_url: Some("https://cdn.test/done.jpg".to_string()),
                duration_secs: Some(42),
            }
        );
        assert_eq!(
            provider.check_status("broken").await.unwrap(),
            VideoJobStatus::Failed {
                error: "script too long".to_string()
            }
        );
        assert_eq!(
            provider.check_status("busy").await.unwrap(),
            VideoJobStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_upload_without_youtube_is_not_configured() {
        let server = MockServer::start().await;

        let result = provider(&server)
            .upload(
                vec![0, 1, 2],
                &VideoMetadata {
                    title: "t".to_string(),
                    description: "d".to_string(),
                    tags: vec![],
                    privacy: "public".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AdapterError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_resumable_upload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(header("Authorization", "Bearer ya29.token"))
            .and(header("X-Upload-Content-Length", "4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/upload/session/abc", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/session/abc"))
            .and(body_bytes(vec![1u8, 2, 3, 4]))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "LONG123"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server).with_uploader(YouTubeUploader::with_endpoints(
            "yt-client",
            SecretString::new("yt-secret".into()),
            SecretString::new("refresh".into()),
            server.uri(),
            format!("{}/token", server.uri()),
        ));

        let uploaded = provider
            .upload(
                vec![1, 2, 3, 4],
                &VideoMetadata {
                    title: "Full walkthrough".to_string(),
                    description: "Long form".to_string(),
                    tags: vec!["windshield".to_string()],
                    privacy: "public".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(uploaded.video_id, "LONG123");
        assert_eq!(uploaded.url, "https://www.youtube.com/watch?v=LONG123");
    }
}
