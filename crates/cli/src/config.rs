//! Configuration loading and management

use anyhow::{Context, Result, bail};
use paa_pipeline_domain::usecases::{PipelineConfig, ReconcileConfig, RenderConfig, ScheduleConfig};
use paa_pipeline_domain::{ClientProfile, SocialPlatform};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::macros::format_description;
use time::{Time, UtcOffset, Weekday};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub schedule: ScheduleSection,

    #[serde(default)]
    pub reconcile: ReconcileSection,

    #[serde(default)]
    pub video: VideoSection,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub generator: GeneratorSection,

    #[serde(default)]
    pub directory: Option<DirectoryConfig>,

    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

/// Which adapters the binary wires up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterMode {
    #[default]
    Live,
    /// Deterministic offline adapters; nothing leaves the machine
    Stub,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default)]
    pub adapters: AdapterMode,

    /// Request timeout for WordPress calls
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSection {
    /// Local publish time, `HH:MM`
    #[serde(default = "default_publish_time")]
    pub publish_time: String,

    /// Offset of `publish_time` from UTC, in hours
    #[serde(default)]
    pub utc_offset_hours: i8,

    #[serde(default = "default_items_per_day")]
    pub items_per_day: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSection {
    #[serde(default = "default_active_interval")]
    pub active_interval_secs: u64,

    #[serde(default = "default_idle_interval")]
    pub idle_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSection {
    #[serde(default = "default_long_video_timeout")]
    pub long_video_timeout_secs: u64,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Environment variable holding the bearer token for `/api` routes
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_generator_url")]
    pub base_url: String,

    #[serde(default = "default_generator_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_generator_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_images_per_item")]
    pub images_per_item: usize,
}

/// The directory brand's own social accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_getlate_key_env")]
    pub api_key_env: String,

    /// Platform → GetLate account id
    #[serde(default)]
    pub accounts: BTreeMap<SocialPlatform, String>,
}

/// One tenant: its business profile plus the credentials of each service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub profile: ClientProfile,

    #[serde(default)]
    pub wordpress: Option<WordPressConfig>,

    #[serde(default)]
    pub getlate: Option<GetLateConfig>,

    #[serde(default)]
    pub podbean: Option<PodbeanConfig>,

    #[serde(default)]
    pub video: Option<VideoServiceConfig>,

    #[serde(default)]
    pub photos: Option<PhotosConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    pub site_url: String,
    pub username: String,
    pub app_password_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetLateConfig {
    #[serde(default = "default_getlate_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub accounts: BTreeMap<SocialPlatform, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodbeanConfig {
    pub client_id: String,
    pub client_secret_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoServiceConfig {
    pub base_url: String,
    pub api_key_env: String,

    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub client_id: String,
    pub client_secret_env: String,
    pub refresh_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotosConfig {
    pub access_token_env: String,

    #[serde(default = "default_photo_ttl")]
    pub cache_ttl_secs: u64,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./paa-pipeline.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_http_timeout() -> u64 {
    paa_pipeline_adapters::DEFAULT_TIMEOUT.as_secs()
}

fn default_publish_time() -> String {
    "09:00".to_string()
}

fn default_items_per_day() -> usize {
    1
}

fn default_active_interval() -> u64 {
    480
}

fn default_idle_interval() -> u64 {
    21_600
}

fn default_long_video_timeout() -> u64 {
    900
}

fn default_aspect_ratio() -> String {
    "9:16".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_token_env() -> String {
    "PAA_PIPELINE_API_TOKEN".to_string()
}

fn default_max_upload_mb() -> usize {
    2048
}

fn default_generator_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

fn default_generator_key_env() -> String {
    "PAA_GENERATOR_API_KEY".to_string()
}

fn default_generator_timeout() -> u64 {
    300
}

fn default_generator_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_images_per_item() -> usize {
    3
}

fn default_getlate_key_env() -> String {
    "GETLATE_API_KEY".to_string()
}

fn default_photo_ttl() -> u64 {
    paa_pipeline_adapters::photos::DEFAULT_PHOTO_TTL.as_secs()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
            max_concurrent: default_max_concurrent(),
            adapters: AdapterMode::default(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            publish_time: default_publish_time(),
            utc_offset_hours: 0,
            items_per_day: default_items_per_day(),
        }
    }
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            active_interval_secs: default_active_interval(),
            idle_interval_secs: default_idle_interval(),
        }
    }
}

impl Default for VideoSection {
    fn default() -> Self {
        Self {
            long_video_timeout_secs: default_long_video_timeout(),
            aspect_ratio: default_aspect_ratio(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            token_env: default_token_env(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            base_url: default_generator_url(),
            api_key_env: default_generator_key_env(),
            timeout_secs: default_generator_timeout(),
            retries: default_generator_retries(),
            backoff_ms: default_backoff_ms(),
            images_per_item: default_images_per_item(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("PAA_PIPELINE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not need credentials
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for client in &self.clients {
            if client.profile.id.trim().is_empty() {
                bail!("A client is missing its id");
            }
            if !seen.insert(client.profile.id.as_str()) {
                bail!("Duplicate client id: {}", client.profile.id);
            }
        }
        self.schedule_config()?;
        Ok(())
    }

    pub fn client(&self, id: &str) -> Option<&ClientConfig> {
        self.clients.iter().find(|c| c.profile.id == id)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            images_per_item: self.generator.images_per_item,
            video_aspect_ratio: self.video.aspect_ratio.clone(),
            long_video_timeout: Duration::from_secs(self.video.long_video_timeout_secs),
            max_concurrent: self.general.max_concurrent,
            render_config: RenderConfig::default(),
        }
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            active_interval: Duration::from_secs(self.reconcile.active_interval_secs),
            idle_interval: Duration::from_secs(self.reconcile.idle_interval_secs),
        }
    }

    /// Publishing always happens on Tuesdays and Thursdays
    pub fn schedule_config(&self) -> Result<ScheduleConfig> {
        let publish_time = Time::parse(
            self.schedule.publish_time.trim(),
            format_description!("[hour]:[minute]"),
        )
        .with_context(|| format!("Invalid publish_time: {}", self.schedule.publish_time))?;
        let utc_offset = UtcOffset::from_hms(self.schedule.utc_offset_hours, 0, 0)
            .with_context(|| format!("Invalid utc_offset_hours: {}", self.schedule.utc_offset_hours))?;
        if self.schedule.items_per_day == 0 {
            bail!("schedule.items_per_day must be at least 1");
        }

        Ok(ScheduleConfig {
            weekdays: vec![Weekday::Tuesday, Weekday::Thursday],
            publish_time,
            utc_offset,
            items_per_day: self.schedule.items_per_day,
        })
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# paa-pipeline configuration

[general]
state_db_path = "./paa-pipeline.sqlite"
log_level = "info"
max_concurrent = 4
adapters = "live"  # live, stub
http_timeout_secs = 30

[schedule]
# Items go out on Tuesdays and Thursdays
publish_time = "09:00"
utc_offset_hours = -8
items_per_day = 1

[reconcile]
active_interval_secs = 480
idle_interval_secs = 21600

[video]
long_video_timeout_secs = 900
aspect_ratio = "9:16"

[server]
bind = "127.0.0.1:8080"
token_env = "PAA_PIPELINE_API_TOKEN"
max_upload_mb = 2048

[generator]
base_url = "http://127.0.0.1:8787"
api_key_env = "PAA_GENERATOR_API_KEY"
timeout_secs = 300
retries = 2
backoff_ms = 500
images_per_item = 3

[directory]
api_key_env = "GETLATE_API_KEY"

[directory.accounts]
facebook = "wrhq-facebook-account-id"
instagram = "wrhq-instagram-account-id"

[[clients]]
id = "acme-auto-glass"
name = "Acme Auto Glass"
website = "https://acmeautoglass.example"
phone = "(206) 555-0100"
street_address = "100 Main St"
city = "Seattle"
state = "WA"
postal_code = "98101"
rating = 4.8
review_count = 212
# map_embed_url = "https://www.google.com/maps/embed?pb=..."
# photo_account = "accounts/123/locations/456"
social_platforms = ["facebook", "instagram", "youtube"]
paa_questions = [
  "How long does windshield replacement take?",
  "Can a chipped windshield be repaired?",
]

[[clients.locations]]
city = "Seattle"
state = "WA"

[[clients.locations]]
city = "Bellevue"
state = "WA"

[clients.wordpress]
site_url = "https://acmeautoglass.example"
username = "publisher"
app_password_env = "ACME_WP_APP_PASSWORD"

[clients.getlate]
api_key_env = "GETLATE_API_KEY"

[clients.getlate.accounts]
facebook = "acme-facebook-account-id"
instagram = "acme-instagram-account-id"
youtube = "acme-youtube-account-id"

# [clients.podbean]
# client_id = "podbean-client-id"
# client_secret_env = "ACME_PODBEAN_SECRET"

# [clients.video]
# base_url = "https://video.example/api"
# api_key_env = "VIDEO_API_KEY"

# [clients.video.youtube]
# client_id = "google-oauth-client-id"
# client_secret_env = "ACME_YOUTUBE_CLIENT_SECRET"
# refresh_token_env = "ACME_YOUTUBE_REFRESH_TOKEN"

# [clients.photos]
# access_token_env = "ACME_GBP_ACCESS_TOKEN"
# cache_ttl_secs = 21600
"#
        .to_string()
    }
}

/// Read a secret from the named environment variable
pub fn read_secret(env_var: &str, service: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No env var configured for {}", service);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} for {}", env_var, service))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty for {}", env_var, service);
    }

    Ok(SecretString::new(value.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        config.validate().unwrap();
        assert_eq!(config.general.adapters, AdapterMode::Live);
        assert_eq!(config.clients.len(), 1);

        let client = &config.clients[0];
        assert_eq!(client.profile.id, "acme-auto-glass");
        assert_eq!(client.profile.locations.len(), 2);
        assert_eq!(client.profile.paa_questions.len(), 2);
        assert!(client.wordpress.is_some());
        assert!(client.podbean.is_none());
        assert_eq!(
            client.getlate.as_ref().unwrap().accounts[&SocialPlatform::Youtube],
            "acme-youtube-account-id"
        );

        let directory = config.directory.as_ref().unwrap();
        assert_eq!(directory.accounts.len(), 2);
    }

    #[test]
    fn test_schedule_config_uses_fixed_weekdays() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        let schedule = config.schedule_config().unwrap();

        assert_eq!(schedule.weekdays, vec![Weekday::Tuesday, Weekday::Thursday]);
        assert_eq!(schedule.publish_time, time::macros::time!(9:00));
        assert_eq!(schedule.utc_offset, time::macros::offset!(-8));
    }

    #[test]
    fn test_invalid_publish_time_is_rejected() {
        let mut config = AppConfig::default();
        config.schedule.publish_time = "9 o'clock".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_client_ids_are_rejected() {
        let mut config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        config.clients.push(config.clients[0].clone());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate client id"));
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::default();

        assert_eq!(config.general.max_concurrent, 4);
        assert_eq!(config.reconcile_config().active_interval, Duration::from_secs(480));
        assert_eq!(
            config.pipeline_config().long_video_timeout,
            Duration::from_secs(900)
        );
        assert!(config.clients.is_empty());
    }
}
