//! Google Business Profile photos, with a per-account TTL cache

use async_trait::async_trait;
use paa_pipeline_domain::{AdapterError, Photo, PhotoSource};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::http::{self, DEFAULT_TIMEOUT};

const DEFAULT_BASE_URL: &str = "https://mybusiness.googleapis.com";

/// How long a photo listing stays fresh
pub const DEFAULT_PHOTO_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Lists the media attached to a Business Profile location.
///
/// `account` is the full resource path, e.g. `accounts/123/locations/456`.
pub struct GbpPhotoSource {
    client: Client,
    access_token: SecretString,
    base_url: String,
    timeout: Duration,
}

impl GbpPhotoSource {
    pub fn new(access_token: SecretString) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(access_token: SecretString, base_url: String) -> Self {
        Self {
            client: http::build_client(DEFAULT_TIMEOUT),
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaList {
    #[serde(default)]
    media_items: Vec<MediaItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItem {
    name: String,
    #[serde(default)]
    google_url: Option<String>,
    #[serde(default)]
    media_format: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl PhotoSource for GbpPhotoSource {
    async fn list_photos(&self, account: &str) -> Result<Vec<Photo>, AdapterError> {
        let response = self
            .client
            .get(format!("{}/v4/{}/media", self.base_url, account))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout))?;
        let list: MediaList =
            http::json(http::check(response, "Google Business Profile").await?).await?;

        Ok(list
            .media_items
            .into_iter()
            .filter(|m| m.media_format.as_deref().is_none_or(|f| f == "PHOTO"))
            .filter_map(|m| {
                let url = m.google_url?;
                Some(Photo {
                    id: m.name.rsplit('/').next().unwrap_or(&m.name).to_string(),
                    url,
                    description: m.description,
                })
            })
            .collect())
    }
}

/// Caches another photo source per account for a fixed TTL
pub struct CachedPhotoSource<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Vec<Photo>)>>,
}

impl<P: PhotoSource> CachedPhotoSource<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_PHOTO_TTL)
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<P: PhotoSource> PhotoSource for CachedPhotoSource<P> {
    async fn list_photos(&self, account: &str) -> Result<Vec<Photo>, AdapterError> {
        if let Some((fetched_at, photos)) = self.entries.lock().await.get(account) {
            if fetched_at.elapsed() < self.ttl {
                return Ok(photos.clone());
            }
        }

        // Errors are not cached; the next call retries
        let photos = self.inner.list_photos(account).await?;
        tracing::debug!(account, count = photos.len(), "Refreshed photo cache");
        self.entries
            .lock()
            .await
            .insert(account.to_string(), (Instant::now(), photos.clone()));
        Ok(photos)
    }
}
