//! Wiring: store, client services and use cases built from configuration

use anyhow::{Context, Result};
use paa_pipeline_adapters::{
    generator_http::{GeneratorConfig, HttpContentGenerator},
    getlate::GetLateScheduler,
    photos::{CachedPhotoSource, GbpPhotoSource},
    podbean::PodbeanPublisher,
    registry::{ClientAdapters, StaticClientServices},
    state::SqliteContentStore,
    stub::{StubBlog, StubGenerator, StubPhotos, StubPodcast, StubSocial, StubVideo},
    video_api::{VideoApiProvider, YouTubeUploader},
    wordpress::WordPressPublisher,
};
use paa_pipeline_domain::{
    ContentGenerator, ContentStore, SocialScheduler, SystemClock,
    usecases::{Pipeline, Reconciler, ScheduleGenerator},
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AdapterMode, AppConfig, ClientConfig, read_secret};

pub type AppPipeline = Pipeline<dyn ContentStore, StaticClientServices, SystemClock>;
pub type AppReconciler = Reconciler<dyn ContentStore, StaticClientServices, SystemClock>;
pub type AppScheduler = ScheduleGenerator<dyn ContentStore, SystemClock>;

/// Everything a command needs, built once per invocation
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn ContentStore>,
    pub services: Arc<StaticClientServices>,
    pub pipeline: Arc<AppPipeline>,
    pub reconciler: Arc<AppReconciler>,
    pub scheduler: AppScheduler,
}

impl AppContext {
    /// Load configuration, open the state database and wire the adapters
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load(config_path)?;
        let store = SqliteContentStore::new(&config.general.state_db_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open state database {}",
                    config.general.state_db_path.display()
                )
            })?;
        let services = build_services(&config)?;
        Ok(Self::from_parts(config, Arc::new(store), services))
    }

    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn ContentStore>,
        services: StaticClientServices,
    ) -> Self {
        let services = Arc::new(services);
        let clock = Arc::new(SystemClock);
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&store),
            Arc::clone(&services),
            Arc::clone(&clock),
            config.pipeline_config(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&pipeline),
            config.reconcile_config(),
        ));
        // validate() already parsed the schedule section
        let scheduler = ScheduleGenerator::new(
            Arc::clone(&store),
            clock,
            config.schedule_config().unwrap_or_default(),
        );

        Self {
            config,
            store,
            services,
            pipeline,
            reconciler,
            scheduler,
        }
    }
}

/// Build the per-client adapter registry from configuration
pub fn build_services(config: &AppConfig) -> Result<StaticClientServices> {
    if config.general.adapters == AdapterMode::Stub {
        tracing::info!("Using stub adapters");
        return Ok(build_stub_services(config));
    }

    let generator_key = read_secret(&config.generator.api_key_env, "content generator")?;
    let generator: Arc<dyn ContentGenerator> = Arc::new(HttpContentGenerator::new(
        generator_key,
        config.generator.base_url.clone(),
        GeneratorConfig {
            timeout_secs: config.generator.timeout_secs,
            retries: config.generator.retries,
            backoff_ms: config.generator.backoff_ms,
        },
    ));

    let mut services = StaticClientServices::new(generator);
    for client in &config.clients {
        let adapters = build_client_adapters(config, client);
        tracing::info!(
            client_id = %client.profile.id,
            services = ?adapters.configured(),
            "Configured client"
        );
        services = services.with_client(client.profile.clone(), adapters);
    }

    if let Some(directory) = &config.directory {
        match read_secret(&directory.api_key_env, "directory GetLate") {
            Ok(key) => {
                let scheduler = GetLateScheduler::new(key, directory.accounts.clone());
                let platforms = scheduler.platforms();
                services = services.with_directory(Arc::new(scheduler), platforms);
            }
            Err(e) => tracing::warn!(error = %e, "Directory social accounts disabled"),
        }
    }

    Ok(services)
}

/// A service whose credentials cannot be read is left unconfigured; the
/// pipeline reports it as skipped rather than failing the whole run.
fn build_client_adapters(config: &AppConfig, client: &ClientConfig) -> ClientAdapters {
    let client_id = client.profile.id.as_str();
    let mut adapters = ClientAdapters::default();

    if let Some(wp) = &client.wordpress {
        match read_secret(&wp.app_password_env, "WordPress") {
            Ok(password) => {
                adapters.blog = Some(Arc::new(WordPressPublisher::with_timeout(
                    &wp.site_url,
                    &wp.username,
                    password,
                    Duration::from_secs(config.general.http_timeout_secs),
                )));
            }
            Err(e) => tracing::warn!(client_id, error = %e, "WordPress disabled"),
        }
    }

    if let Some(getlate) = &client.getlate {
        match read_secret(&getlate.api_key_env, "GetLate") {
            Ok(key) => {
                adapters.social = Some(Arc::new(GetLateScheduler::new(
                    key,
                    getlate.accounts.clone(),
                )));
            }
            Err(e) => tracing::warn!(client_id, error = %e, "Social scheduling disabled"),
        }
    }

    if let Some(podbean) = &client.podbean {
        match read_secret(&podbean.client_secret_env, "Podbean") {
            Ok(secret) => {
                adapters.podcast = Some(Arc::new(PodbeanPublisher::new(&podbean.client_id, secret)));
            }
            Err(e) => tracing::warn!(client_id, error = %e, "Podbean disabled"),
        }
    }

    if let Some(video) = &client.video {
        match read_secret(&video.api_key_env, "video provider") {
            Ok(key) => {
                let mut provider = VideoApiProvider::new(key, video.base_url.clone());
                if let Some(youtube) = &video.youtube {
                    match (
                        read_secret(&youtube.client_secret_env, "YouTube"),
                        read_secret(&youtube.refresh_token_env, "YouTube"),
                    ) {
                        (Ok(secret), Ok(refresh)) => {
                            provider = provider.with_uploader(YouTubeUploader::new(
                                &youtube.client_id,
                                secret,
                                refresh,
                            ));
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            tracing::warn!(client_id, error = %e, "YouTube upload disabled")
                        }
                    }
                }
                adapters.video = Some(Arc::new(provider));
            }
            Err(e) => tracing::warn!(client_id, error = %e, "Video generation disabled"),
        }
    }

    if let Some(photos) = &client.photos {
        match read_secret(&photos.access_token_env, "Google Business Profile") {
            Ok(token) => {
                adapters.photos = Some(Arc::new(CachedPhotoSource::with_ttl(
                    GbpPhotoSource::new(token),
                    Duration::from_secs(photos.cache_ttl_secs),
                )));
            }
            Err(e) => tracing::warn!(client_id, error = %e, "Photo source disabled"),
        }
    }

    adapters
}

fn build_stub_services(config: &AppConfig) -> StaticClientServices {
    let mut services = StaticClientServices::new(Arc::new(StubGenerator));
    for client in &config.clients {
        services = services.with_client(
            client.profile.clone(),
            ClientAdapters {
                blog: Some(Arc::new(StubBlog::default())),
                podcast: Some(Arc::new(StubPodcast::default())),
                social: Some(Arc::new(StubSocial::default())),
                video: Some(Arc::new(StubVideo::default())),
                photos: Some(Arc::new(StubPhotos::default())),
            },
        );
    }

    if let Some(directory) = &config.directory {
        let scheduler: Arc<dyn SocialScheduler> = Arc::new(StubSocial::default());
        services = services.with_directory(scheduler, directory.accounts.keys().copied().collect());
    }
    services
}
