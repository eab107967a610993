//! schema.org JSON-LD generation for a published content item

use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::model::{BlogPost, ClientProfile, ContentImage, ContentItem, Podcast, Video};

/// Everything the schema draws from. Rebuilt on every embed because ratings,
/// images and media durations can change between runs.
#[derive(Debug, Clone, Copy)]
pub struct SchemaInput<'a> {
    pub item: &'a ContentItem,
    pub client: &'a ClientProfile,
    pub blog: &'a BlogPost,
    pub images: &'a [ContentImage],
    pub short_video: Option<&'a Video>,
    /// Public URL of the short video (YouTube post), when known
    pub short_video_url: Option<&'a str>,
    pub long_video_url: Option<&'a str>,
    pub podcast: Option<&'a Podcast>,
}

/// Build the `@graph` document for the item
pub fn build_schema(input: &SchemaInput<'_>) -> Value {
    let page_url = input
        .blog
        .wordpress_url
        .clone()
        .or_else(|| input.item.refs.wordpress_url.clone())
        .unwrap_or_else(|| input.client.website.clone());
    let business_id = format!("{}#business", input.client.website.trim_end_matches('/'));
    let featured = input
        .images
        .iter()
        .find(|i| i.featured)
        .or_else(|| input.images.first())
        .map(|i| i.url.clone());

    let mut graph = vec![
        business_node(input.client, &business_id, &input.item.location.city),
        article_node(input, &page_url, &business_id, featured.as_deref()),
        faq_node(input, &page_url),
    ];

    if let Some(url) = input.short_video_url {
        graph.push(video_node(
            &format!("{}#short-video", page_url),
            &input.blog.title,
            &input.blog.meta_description,
            url,
            input.short_video.and_then(|v| v.thumbnail_url.as_deref()),
            input.short_video.and_then(|v| v.duration_secs),
            input.short_video.map(|v| v.updated_at),
        ));
    }

    if let Some(url) = input.long_video_url {
        graph.push(video_node(
            &format!("{}#long-video", page_url),
            &input.blog.title,
            &input.blog.meta_description,
            url,
            None,
            None,
            None,
        ));
    }

    if let Some(podcast) = input.podcast {
        if let Some(node) = podcast_node(podcast, &page_url) {
            graph.push(node);
        }
    }

    json!({
        "@context": "https://schema.org",
        "@graph": graph,
    })
}

fn business_node(client: &ClientProfile, id: &str, area: &str) -> Value {
    let mut node = json!({
        "@type": "AutoRepair",
        "@id": id,
        "name": client.name,
        "url": client.website,
        "areaServed": area,
        "address": {
            "@type": "PostalAddress",
            "streetAddress": client.street_address,
            "addressLocality": client.city,
            "addressRegion": client.state,
            "postalCode": client.postal_code,
            "addressCountry": "US",
        },
    });
    if let Some(phone) = &client.phone {
        node["telephone"] = json!(phone);
    }
    if let Some(logo) = &client.logo_url {
        node["logo"] = json!(logo);
    }
    if let (Some(rating), Some(count)) = (client.rating, client.review_count) {
        if count > 0 {
            node["aggregateRating"] = json!({
                "@type": "AggregateRating",
                "ratingValue": format!("{:.1}", rating),
                "reviewCount": count,
                "bestRating": "5",
            });
        }
    }
    node
}

fn article_node(
    input: &SchemaInput<'_>,
    page_url: &str,
    business_id: &str,
    image: Option<&str>,
) -> Value {
    let mut node = json!({
        "@type": "BlogPosting",
        "@id": format!("{}#article", page_url),
        "headline": input.blog.title,
        "description": input.blog.meta_description,
        "url": page_url,
        "mainEntityOfPage": page_url,
        "datePublished": rfc3339(input.item.scheduled_at),
        "dateModified": rfc3339(input.blog.updated_at),
        "author": { "@id": business_id },
        "publisher": { "@id": business_id },
        "about": input.item.paa_question,
    });
    if let Some(image) = image {
        node["image"] = json!(image);
    }
    node
}

fn faq_node(input: &SchemaInput<'_>, page_url: &str) -> Value {
    json!({
        "@type": "FAQPage",
        "@id": format!("{}#faq", page_url),
        "mainEntity": [{
            "@type": "Question",
            "name": input.item.paa_question,
            "acceptedAnswer": {
                "@type": "Answer",
                "text": input.blog.excerpt,
            },
        }],
    })
}

fn video_node(
    id: &str,
    name: &str,
    description: &str,
    url: &str,
    thumbnail: Option<&str>,
    duration_secs: Option<u32>,
    uploaded: Option<OffsetDateTime>,
) -> Value {
    let mut node = json!({
        "@type": "VideoObject",
        "@id": id,
        "name": name,
        "description": description,
        "contentUrl": url,
        "embedUrl": url,
    });
    if let Some(thumbnail) = thumbnail {
        node["thumbnailUrl"] = json!(thumbnail);
    }
    if let Some(secs) = duration_secs {
        node["duration"] = json!(iso8601_duration(secs));
    }
    if let Some(uploaded) = uploaded {
        node["uploadDate"] = json!(rfc3339(uploaded));
    }
    node
}

fn podcast_node(podcast: &Podcast, page_url: &str) -> Option<Value> {
    let url = podcast.episode_url.as_deref().or(podcast.audio_url.as_deref())?;
    let mut audio = json!({
        "@type": "AudioObject",
        "contentUrl": podcast.audio_url.as_deref().unwrap_or(url),
    });
    if let Some(secs) = podcast.duration_secs {
        audio["duration"] = json!(iso8601_duration(secs));
    }
    Some(json!({
        "@type": "PodcastEpisode",
        "@id": format!("{}#podcast", page_url),
        "name": podcast.title,
        "description": podcast.description,
        "url": url,
        "associatedMedia": audio,
    }))
}

/// Seconds as an ISO 8601 duration, e.g. 95 -> "PT1M35S"
pub fn iso8601_duration(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 || (hours == 0 && minutes == 0) {
        out.push_str(&format!("{}S", seconds));
    }
    out
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageSource, PodcastStatus, ServiceLocation};
    use time::macros::datetime;
    use uuid::Uuid;

    fn client() -> ClientProfile {
        ClientProfile {
            id: "acme".to_string(),
            name: "Acme Auto Glass".to_string(),
            website: "https://acme.test/".to_string(),
            phone: Some("555-0100".to_string()),
            street_address: Some("1 Main St".to_string()),
            city: "Seattle".to_string(),
            state: "WA".to_string(),
            postal_code: Some("98101".to_string()),
            rating: Some(4.9),
            review_count: Some(212),
            logo_url: None,
            map_embed_url: None,
            photo_account: None,
            social_platforms: vec![],
            paa_questions: vec![],
            locations: vec![],
        }
    }

    fn blog(item: &ContentItem) -> BlogPost {
        BlogPost {
            item_id: item.id,
            title: "How long does windshield replacement take?".to_string(),
            slug: "windshield-replacement-time".to_string(),
            html: "<p>About an hour.</p>".to_string(),
            excerpt: "About an hour plus cure time.".to_string(),
            meta_description: "Windshield replacement timing in Seattle".to_string(),
            wordpress_post_id: Some(7),
            wordpress_url: Some("https://acme.test/blog/windshield".to_string()),
            schema_json: None,
            updated_at: datetime!(2026-03-03 10:00 UTC),
        }
    }

    #[test]
    fn test_iso8601_duration() {
        assert_eq!(iso8601_duration(0), "PT0S");
        assert_eq!(iso8601_duration(45), "PT45S");
        assert_eq!(iso8601_duration(95), "PT1M35S");
        assert_eq!(iso8601_duration(3600), "PT1H");
        assert_eq!(iso8601_duration(3725), "PT1H2M5S");
    }

    #[test]
    fn test_schema_includes_media_nodes_when_present() {
        let now = datetime!(2026-03-03 09:00 UTC);
        let item = ContentItem::scheduled(
            "acme",
            "How long does windshield replacement take?",
            ServiceLocation::new("Seattle", "WA"),
            now,
            now,
        );
        let client = client();
        let blog = blog(&item);
        let images = vec![ContentImage {
            id: Uuid::new_v4(),
            item_id: item.id,
            url: "https://img.test/hero.png".to_string(),
            alt_text: "hero".to_string(),
            source: ImageSource::Generated,
            featured: true,
        }];
        let podcast = Podcast {
            item_id: item.id,
            status: PodcastStatus::Published,
            title: "Episode".to_string(),
            description: "desc".to_string(),
            audio_url: Some("https://audio.test/e.mp3".to_string()),
            duration_secs: Some(300),
            episode_id: Some("ep1".to_string()),
            episode_url: Some("https://pod.test/e/ep1".to_string()),
            player_url: Some("https://pod.test/player/ep1".to_string()),
            error_message: None,
            updated_at: now,
        };

        let schema = build_schema(&SchemaInput {
            item: &item,
            client: &client,
            blog: &blog,
            images: &images,
            short_video: None,
            short_video_url: Some("https://youtube.com/shorts/dQw4w9WgXcQ"),
            long_video_url: None,
            podcast: Some(&podcast),
        });

        let graph = schema["@graph"].as_array().unwrap();
        let types: Vec<&str> = graph.iter().map(|n| n["@type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec![
                "AutoRepair",
                "BlogPosting",
                "FAQPage",
                "VideoObject",
                "PodcastEpisode"
            ]
        );
        assert_eq!(graph[0]["aggregateRating"]["ratingValue"], "4.9");
        assert_eq!(graph[1]["image"], "https://img.test/hero.png");
        assert_eq!(graph[4]["associatedMedia"]["duration"], "PT5M");
    }
}
