//! Podbean podcast publishing adapter

use async_trait::async_trait;
use paa_pipeline_domain::{AdapterError, EpisodeRequest, PodcastPublisher, PublishedEpisode};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::http::{self, DEFAULT_TIMEOUT};

const DEFAULT_BASE_URL: &str = "https://api.podbean.com";

/// Refresh the token this long before Podbean says it expires
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Publishes episodes to a Podbean channel using client credentials
pub struct PodbeanPublisher {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
    timeout: Duration,
}

impl PodbeanPublisher {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self::with_base_url(client_id, client_secret, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        client_id: impl Into<String>,
        client_secret: SecretString,
        base_url: String,
    ) -> Self {
        Self {
            client: http::build_client(DEFAULT_TIMEOUT),
            client_id: client_id.into(),
            client_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    async fn access_token(&self) -> Result<String, AdapterError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/oauth/token", self.base_url))
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let token: TokenResponse = http::json(http::check(response, "Podbean").await?).await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Deserialize)]
struct EpisodeEnvelope {
    episode: EpisodeBody,
}

#[derive(Deserialize)]
struct EpisodeBody {
    id: String,
    permalink_url: String,
    #[serde(default)]
    player_url: Option<String>,
}

#[async_trait]
impl PodcastPublisher for PodbeanPublisher {
    async fn publish(&self, episode: &EpisodeRequest) -> Result<PublishedEpisode, AdapterError> {
        let token = self.access_token().await?;

        let mut form = vec![
            ("access_token", token),
            ("title", episode.title.clone()),
            ("content", episode.description.clone()),
            ("status", "publish".to_string()),
            ("type", "public".to_string()),
            ("remote_media_url", episode.audio_url.clone()),
        ];
        if let Some(image) = &episode.image_url {
            form.push(("remote_logo_url", image.clone()));
        }

        let response = self
            .client
            .post(format!("{}/v1/episodes", self.base_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let envelope: EpisodeEnvelope = http::json(http::check(response, "Podbean").await?).await?;
        let body = envelope.episode;

        // Podbean omits the player link for some plans; the embed player takes the episode id
        let player_url = body.player_url.unwrap_or_else(|| {
            format!(
                "https://www.podbean.com/player-v2/?i={}&share=1&download=1",
                body.id
            )
        });
        tracing::info!(episode_id = %body.id, "Published Podbean episode");

        Ok(PublishedEpisode {
            episode_id: body.id,
            url: body.permalink_url,
            player_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> PodbeanPublisher {
        PodbeanPublisher::with_base_url(
            "podbean-client",
            SecretString::new("podbean-secret".into()),
            server.uri(),
        )
    }

    fn episode() -> EpisodeRequest {
        EpisodeRequest {
            title: "Windshield chips explained".to_string(),
            description: "Acme explains chip repair.".to_string(),
            audio_url: "https://audio.test/chips.mp3".to_string(),
            image_url: None,
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_in": 604800
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_publish_reuses_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v1/episodes"))
            .and(body_string_contains("access_token=tok-1"))
            .and(body_string_contains("remote_media_url=https%3A%2F%2Faudio.test%2Fchips.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "episode": {
                    "id": "EP123",
                    "permalink_url": "https://acme.podbean.com/e/chips/",
                    "player_url": "https://www.podbean.com/player-v2/?i=EP123"
                }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let publisher = publisher(&server);
        let first = publisher.publish(&episode()).await.unwrap();
        publisher.publish(&episode()).await.unwrap();

        assert_eq!(first.episode_id, "EP123");
        assert_eq!(first.url, "https://acme.podbean.com/e/chips/");
        assert_eq!(first.player_url, "https://www.podbean.com/player-v2/?i=EP123");
    }

    #[tokio::test]
    async fn test_missing_player_url_falls_back_to_episode_player() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v1/episodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "episode": { "id": "EP9", "permalink_url": "https://acme.podbean.com/e/9/" }
            })))
            .mount(&server)
            .await;

        let published = publisher(&server).publish(&episode()).await.unwrap();

        assert!(published.player_url.contains("i=EP9"));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = publisher(&server).publish(&episode()).await;

        assert!(matches!(result, Err(AdapterError::Auth(_))));
    }
}
