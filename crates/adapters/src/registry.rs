//! Per-client adapter registry

use paa_pipeline_domain::{
    BlogPublisher, ClientProfile, ClientServices, ContentGenerator, PhotoSource, PodcastPublisher,
    SocialPlatform, SocialScheduler, VideoProvider,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Adapters configured for one client; `None` means no credentials
#[derive(Default, Clone)]
pub struct ClientAdapters {
    pub blog: Option<Arc<dyn BlogPublisher>>,
    pub podcast: Option<Arc<dyn PodcastPublisher>>,
    pub social: Option<Arc<dyn SocialScheduler>>,
    pub video: Option<Arc<dyn VideoProvider>>,
    pub photos: Option<Arc<dyn PhotoSource>>,
}

impl ClientAdapters {
    /// Names of the services this client can reach, for diagnostics
    pub fn configured(&self) -> Vec<&'static str> {
        [
            ("blog", self.blog.is_some()),
            ("podcast", self.podcast.is_some()),
            ("social", self.social.is_some()),
            ("video", self.video.is_some()),
            ("photos", self.photos.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

struct ClientEntry {
    profile: ClientProfile,
    adapters: ClientAdapters,
}

/// Client services built once at startup from configuration
pub struct StaticClientServices {
    generator: Arc<dyn ContentGenerator>,
    clients: BTreeMap<String, ClientEntry>,
    directory: Option<(Arc<dyn SocialScheduler>, Vec<SocialPlatform>)>,
}

impl StaticClientServices {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            generator,
            clients: BTreeMap::new(),
            directory: None,
        }
    }

    pub fn with_client(mut self, profile: ClientProfile, adapters: ClientAdapters) -> Self {
        self.clients
            .insert(profile.id.clone(), ClientEntry { profile, adapters });
        self
    }

    /// Directory accounts that post every client's media as well
    pub fn with_directory(
        mut self,
        scheduler: Arc<dyn SocialScheduler>,
        platforms: Vec<SocialPlatform>,
    ) -> Self {
        self.directory = Some((scheduler, platforms));
        self
    }

    pub fn client_ids(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    pub fn adapters(&self, client_id: &str) -> Option<&ClientAdapters> {
        self.clients.get(client_id).map(|entry| &entry.adapters)
    }
}

impl ClientServices for StaticClientServices {
    fn profile(&self, client_id: &str) -> Option<ClientProfile> {
        self.clients
            .get(client_id)
            .map(|entry| entry.profile.clone())
    }

    fn generator(&self) -> Arc<dyn ContentGenerator> {
        Arc::clone(&self.generator)
    }

    fn blog(&self, client_id: &str) -> Option<Arc<dyn BlogPublisher>> {
        self.adapters(client_id)?.blog.clone()
    }

    fn podcast(&self, client_id: &str) -> Option<Arc<dyn PodcastPublisher>> {
        self.adapters(client_id)?.podcast.clone()
    }

    fn social(&self, client_id: &str) -> Option<Arc<dyn SocialScheduler>> {
        self.adapters(client_id)?.social.clone()
    }

    fn directory_social(&self) -> Option<Arc<dyn SocialScheduler>> {
        self.directory.as_ref().map(|(s, _)| Arc::clone(s))
    }

    fn directory_platforms(&self) -> Vec<SocialPlatform> {
        self.directory
            .as_ref()
            .map(|(_, platforms)| platforms.clone())
            .unwrap_or_default()
    }

    fn video(&self, client_id: &str) -> Option<Arc<dyn VideoProvider>> {
        self.adapters(client_id)?.video.clone()
    }

    fn photos(&self, client_id: &str) -> Option<Arc<dyn PhotoSource>> {
        self.adapters(client_id)?.photos.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StubBlog, StubGenerator, StubSocial};
    use paa_pipeline_domain::ServiceLocation;

    fn profile(id: &str) -> ClientProfile {
        ClientProfile {
            id: id.to_string(),
            name: "Acme Auto Glass".to_string(),
            website: "https://acme.test".to_string(),
            phone: None,
            street_address: None,
            city: "Seattle".to_string(),
            state: "WA".to_string(),
            postal_code: None,
            rating: None,
            review_count: None,
            logo_url: None,
            map_embed_url: None,
            photo_account: None,
            social_platforms: vec![],
            paa_questions: vec![],
            locations: vec![ServiceLocation::new("Seattle", "WA")],
        }
    }

    #[test]
    fn test_missing_adapters_resolve_to_none() {
        let services = StaticClientServices::new(Arc::new(StubGenerator))
            .with_client(
                profile("acme"),
                ClientAdapters {
                    blog: Some(Arc::new(StubBlog::default())),
                    ..Default::default()
                },
            )
            .with_directory(
                Arc::new(StubSocial::default()),
                vec![SocialPlatform::Facebook],
            );

        assert!(services.blog("acme").is_some());
        assert!(services.podcast("acme").is_none());
        assert!(services.blog("unknown").is_none());
        assert!(services.profile("unknown").is_none());
        assert_eq!(services.directory_platforms(), vec![SocialPlatform::Facebook]);
        assert_eq!(services.adapters("acme").unwrap().configured(), vec!["blog"]);
    }
}
