//! SQLite content store implementation

use async_trait::async_trait;
use paa_pipeline_domain::{
    BlogPost, ContentImage, ContentItem, ContentStore, EmbedMarks, ExternalRefs, ItemFilter,
    ItemPatch, Podcast, ServiceLocation, SocialPost, StageFlags, StageIssue, StoreError, Video,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

fn database(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn serialization(e: impl Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

fn fmt_ts(ts: OffsetDateTime) -> Result<String, StoreError> {
    ts.format(&Rfc3339).map_err(serialization)
}

fn fmt_opt_ts(ts: Option<OffsetDateTime>) -> Result<Option<String>, StoreError> {
    ts.map(fmt_ts).transpose()
}

fn parse_ts(s: &str) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(serialization)
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<OffsetDateTime>, StoreError> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_id(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(serialization)
}

const ITEM_COLUMNS: &str = r#"
    id, client_id, paa_question, location, scheduled_at, status,
    blog_generated, images_generated, social_generated, podcast_generated,
    short_video_generated, schema_generated,
    wordpress_post_id, wordpress_url, podbean_episode_id, podbean_url, podbean_player_url,
    short_video_job_id, long_video_url,
    podcast_added_at, short_video_added_at, long_video_added_at, last_embedded_at,
    created_at, updated_at
"#;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS content_items (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        paa_question TEXT NOT NULL,
        question_key TEXT NOT NULL,
        location TEXT NOT NULL,
        location_key TEXT NOT NULL,
        scheduled_at TEXT NOT NULL,
        scheduled_ts INTEGER NOT NULL,
        status TEXT NOT NULL,
        blog_generated INTEGER NOT NULL DEFAULT 0,
        images_generated INTEGER NOT NULL DEFAULT 0,
        social_generated INTEGER NOT NULL DEFAULT 0,
        podcast_generated INTEGER NOT NULL DEFAULT 0,
        short_video_generated INTEGER NOT NULL DEFAULT 0,
        schema_generated INTEGER NOT NULL DEFAULT 0,
        wordpress_post_id INTEGER,
        wordpress_url TEXT,
        podbean_episode_id TEXT,
        podbean_url TEXT,
        podbean_player_url TEXT,
        short_video_job_id TEXT,
        long_video_url TEXT,
        podcast_added_at TEXT,
        short_video_added_at TEXT,
        long_video_added_at TEXT,
        last_embedded_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(client_id, question_key, location_key)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_items_due
    ON content_items(status, scheduled_ts)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS item_social_refs (
        item_id TEXT NOT NULL,
        ref_key TEXT NOT NULL,
        provider_id TEXT NOT NULL,
        PRIMARY KEY (item_id, ref_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS item_issues (
        item_id TEXT NOT NULL,
        stage TEXT NOT NULL,
        kind TEXT NOT NULL,
        message TEXT NOT NULL,
        recorded_at TEXT NOT NULL,
        PRIMARY KEY (item_id, stage)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        item_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        html TEXT NOT NULL,
        excerpt TEXT NOT NULL,
        meta_description TEXT NOT NULL,
        wordpress_post_id INTEGER,
        wordpress_url TEXT,
        schema_json TEXT,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS content_images (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        item_id TEXT NOT NULL,
        url TEXT NOT NULL,
        alt_text TEXT NOT NULL,
        source TEXT NOT NULL,
        featured INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS social_posts (
        id TEXT PRIMARY KEY,
        item_id TEXT NOT NULL,
        owner TEXT NOT NULL,
        platform TEXT NOT NULL,
        media TEXT NOT NULL,
        status TEXT NOT NULL,
        caption TEXT NOT NULL,
        provider_post_id TEXT,
        published_url TEXT,
        error_message TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_social_status ON social_posts(status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        item_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        provider_job_id TEXT,
        video_url TEXT,
        thumbnail_url TEXT,
        duration_secs INTEGER,
        error_message TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_videos_status ON videos(status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS podcasts (
        item_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        audio_url TEXT,
        duration_secs INTEGER,
        episode_id TEXT,
        episode_url TEXT,
        player_url TEXT,
        error_message TEXT,
        updated_at TEXT NOT NULL
    )
    "#,
];

/// SQLite-backed content store
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(database)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(database)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(database)?;
        }
        Ok(())
    }

    fn item_from_row(row: &SqliteRow) -> Result<ContentItem, StoreError> {
        let location: String = row.try_get("location").map_err(database)?;
        let location: ServiceLocation = serde_json::from_str(&location).map_err(serialization)?;
        let status: String = row.try_get("status").map_err(database)?;
        let scheduled_at: String = row.try_get("scheduled_at").map_err(database)?;
        let created_at: String = row.try_get("created_at").map_err(database)?;
        let updated_at: String = row.try_get("updated_at").map_err(database)?;
        let wordpress_post_id: Option<i64> = row.try_get("wordpress_post_id").map_err(database)?;
        let id: String = row.try_get("id").map_err(database)?;

        Ok(ContentItem {
            id: parse_id(&id)?,
            client_id: row.try_get("client_id").map_err(database)?,
            paa_question: row.try_get("paa_question").map_err(database)?,
            location,
            scheduled_at: parse_ts(&scheduled_at)?,
            status: status.parse().map_err(serialization)?,
            flags: StageFlags {
                blog_generated: row.try_get("blog_generated").map_err(database)?,
                images_generated: row.try_get("images_generated").map_err(database)?,
                social_generated: row.try_get("social_generated").map_err(database)?,
                podcast_generated: row.try_get("podcast_generated").map_err(database)?,
                short_video_generated: row.try_get("short_video_generated").map_err(database)?,
                schema_generated: row.try_get("schema_generated").map_err(database)?,
            },
            embeds: EmbedMarks {
                podcast_added_at: parse_opt_ts(
                    row.try_get("podcast_added_at").map_err(database)?,
                )?,
                short_video_added_at: parse_opt_ts(
                    row.try_get("short_video_added_at").map_err(database)?,
                )?,
                long_video_added_at: parse_opt_ts(
                    row.try_get("long_video_added_at").map_err(database)?,
                )?,
                last_embedded_at: parse_opt_ts(
                    row.try_get("last_embedded_at").map_err(database)?,
                )?,
            },
            refs: ExternalRefs {
                wordpress_post_id: wordpress_post_id.map(|id| id as u64),
                wordpress_url: row.try_get("wordpress_url").map_err(database)?,
                podbean_episode_id: row.try_get("podbean_episode_id").map_err(database)?,
                podbean_url: row.try_get("podbean_url").map_err(database)?,
                podbean_player_url: row.try_get("podbean_player_url").map_err(database)?,
                short_video_job_id: row.try_get("short_video_job_id").map_err(database)?,
                long_video_url: row.try_get("long_video_url").map_err(database)?,
                social_post_ids: BTreeMap::new(),
            },
            issues: BTreeMap::new(),
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }

    /// Fill in the child-table parts of an item
    async fn load_children(&self, item: &mut ContentItem) -> Result<(), StoreError> {
        let id = item.id.to_string();

        let refs: Vec<(String, String)> = sqlx::query_as(
            "SELECT ref_key, provider_id FROM item_social_refs WHERE item_id = ?",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;
        item.refs.social_post_ids = refs.into_iter().collect();

        let issues: Vec<(String, String, String, String)> = sqlx::query_as(
            "SELECT stage, kind, message, recorded_at FROM item_issues WHERE item_id = ?",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;
        for (stage, kind, message, recorded_at) in issues {
            item.issues.insert(
                stage.parse().map_err(serialization)?,
                StageIssue {
                    kind: kind.parse().map_err(serialization)?,
                    message,
                    recorded_at: parse_ts(&recorded_at)?,
                },
            );
        }
        Ok(())
    }

    fn social_from_row(row: &SqliteRow) -> Result<SocialPost, StoreError> {
        let id: String = row.try_get("id").map_err(database)?;
        let item_id: String = row.try_get("item_id").map_err(database)?;
        let owner: String = row.try_get("owner").map_err(database)?;
        let platform: String = row.try_get("platform").map_err(database)?;
        let media: String = row.try_get("media").map_err(database)?;
        let status: String = row.try_get("status").map_err(database)?;
        let created_at: String = row.try_get("created_at").map_err(database)?;
        let updated_at: String = row.try_get("updated_at").map_err(database)?;

        Ok(SocialPost {
            id: parse_id(&id)?,
            item_id: parse_id(&item_id)?,
            owner: owner.parse().map_err(serialization)?,
            platform: platform.parse().map_err(serialization)?,
            media: media.parse().map_err(serialization)?,
            status: status.parse().map_err(serialization)?,
            caption: row.try_get("caption").map_err(database)?,
            provider_post_id: row.try_get("provider_post_id").map_err(database)?,
            published_url: row.try_get("published_url").map_err(database)?,
            error_message: row.try_get("error_message").map_err(database)?,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }

    fn video_from_row(row: &SqliteRow) -> Result<Video, StoreError> {
        let id: String = row.try_get("id").map_err(database)?;
        let item_id: String = row.try_get("item_id").map_err(database)?;
        let kind: String = row.try_get("kind").map_err(database)?;
        let status: String = row.try_get("status").map_err(database)?;
        let duration: Option<i64> = row.try_get("duration_secs").map_err(database)?;
        let created_at: String = row.try_get("created_at").map_err(database)?;
        let updated_at: String = row.try_get("updated_at").map_err(database)?;

        Ok(Video {
            id: parse_id(&id)?,
            item_id: parse_id(&item_id)?,
            kind: kind.parse().map_err(serialization)?,
            status: status.parse().map_err(serialization)?,
            provider_job_id: row.try_get("provider_job_id").map_err(database)?,
            video_url: row.try_get("video_url").map_err(database)?,
            thumbnail_url: row.try_get("thumbnail_url").map_err(database)?,
            duration_secs: duration.map(|d| d as u32),
            error_message: row.try_get("error_message").map_err(database)?,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn insert_item(&self, item: &ContentItem) -> Result<(), StoreError> {
        let (_, question_key, location_key) = item.topic_key();
        let location = serde_json::to_string(&item.location).map_err(serialization)?;

        let mut tx = self.pool.begin().await.map_err(database)?;
        sqlx::query(
            r#"
            INSERT INTO content_items (
                id, client_id, paa_question, question_key, location, location_key,
                scheduled_at, scheduled_ts, status,
                blog_generated, images_generated, social_generated, podcast_generated,
                short_video_generated, schema_generated,
                wordpress_post_id, wordpress_url, podbean_episode_id, podbean_url,
                podbean_player_url, short_video_job_id, long_video_url,
                podcast_added_at, short_video_added_at, long_video_added_at, last_embedded_at,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.client_id)
        .bind(&item.paa_question)
        .bind(&question_key)
        .bind(&location)
        .bind(&location_key)
        .bind(fmt_ts(item.scheduled_at)?)
        .bind(item.scheduled_at.unix_timestamp())
        .bind(item.status.as_str())
        .bind(item.flags.blog_generated)
        .bind(item.flags.images_generated)
        .bind(item.flags.social_generated)
        .bind(item.flags.podcast_generated)
        .bind(item.flags.short_video_generated)
        .bind(item.flags.schema_generated)
        .bind(item.refs.wordpress_post_id.map(|id| id as i64))
        .bind(&item.refs.wordpress_url)
        .bind(&item.refs.podbean_episode_id)
        .bind(&item.refs.podbean_url)
        .bind(&item.refs.podbean_player_url)
        .bind(&item.refs.short_video_job_id)
        .bind(&item.refs.long_video_url)
        .bind(fmt_opt_ts(item.embeds.podcast_added_at)?)
        .bind(fmt_opt_ts(item.embeds.short_video_added_at)?)
        .bind(fmt_opt_ts(item.embeds.long_video_added_at)?)
        .bind(fmt_opt_ts(item.embeds.last_embedded_at)?)
        .bind(fmt_ts(item.created_at)?)
        .bind(fmt_ts(item.updated_at)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(format!(
                "'{}' is already scheduled for {} in {}",
                item.paa_question,
                item.client_id,
                item.location.label()
            )),
            other => database(other),
        })?;

        for (key, provider_id) in &item.refs.social_post_ids {
            sqlx::query(
                "INSERT INTO item_social_refs (item_id, ref_key, provider_id) VALUES (?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(key)
            .bind(provider_id)
            .execute(&mut *tx)
            .await
            .map_err(database)?;
        }
        for (stage, issue) in &item.issues {
            sqlx::query(
                "INSERT INTO item_issues (item_id, stage, kind, message, recorded_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(stage.as_str())
            .bind(issue.kind.as_str())
            .bind(&issue.message)
            .bind(fmt_ts(issue.recorded_at)?)
            .execute(&mut *tx)
            .await
            .map_err(database)?;
        }

        tx.commit().await.map_err(database)?;
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM content_items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(database)?;

        match row {
            Some(row) => {
                let mut item = Self::item_from_row(&row)?;
                self.load_children(&mut item).await?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ContentItem>, StoreError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM content_items WHERE 1 = 1",
            ITEM_COLUMNS
        ));
        if let Some(client_id) = &filter.client_id {
            query.push(" AND client_id = ").push_bind(client_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(due) = filter.due_before {
            query
                .push(" AND scheduled_ts <= ")
                .push_bind(due.unix_timestamp());
        }
        query.push(" ORDER BY scheduled_ts, created_at");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut item = Self::item_from_row(row)?;
            self.load_children(&mut item).await?;
            items.push(item);
        }
        Ok(items)
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> Result<ContentItem, StoreError> {
        let item_id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(database)?;

        let result = sqlx::query(
            r#"
            UPDATE content_items SET
                status = COALESCE(?, status),
                blog_generated = COALESCE(?, blog_generated),
                images_generated = COALESCE(?, images_generated),
                social_generated = COALESCE(?, social_generated),
                podcast_generated = COALESCE(?, podcast_generated),
                short_video_generated = COALESCE(?, short_video_generated),
                schema_generated = COALESCE(?, schema_generated),
                wordpress_post_id = COALESCE(?, wordpress_post_id),
                wordpress_url = COALESCE(?, wordpress_url),
                podbean_episode_id = COALESCE(?, podbean_episode_id),
                podbean_url = COALESCE(?, podbean_url),
                podbean_player_url = COALESCE(?, podbean_player_url),
                short_video_job_id = COALESCE(?, short_video_job_id),
                long_video_url = COALESCE(?, long_video_url),
                podcast_added_at = COALESCE(?, podcast_added_at),
                short_video_added_at = COALESCE(?, short_video_added_at),
                long_video_added_at = COALESCE(?, long_video_added_at),
                last_embedded_at = COALESCE(?, last_embedded_at),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.blog_generated)
        .bind(patch.images_generated)
        .bind(patch.social_generated)
        .bind(patch.podcast_generated)
        .bind(patch.short_video_generated)
        .bind(patch.schema_generated)
        .bind(patch.wordpress_post_id.map(|id| id as i64))
        .bind(&patch.wordpress_url)
        .bind(&patch.podbean_episode_id)
        .bind(&patch.podbean_url)
        .bind(&patch.podbean_player_url)
        .bind(&patch.short_video_job_id)
        .bind(&patch.long_video_url)
        .bind(fmt_opt_ts(patch.podcast_added_at)?)
        .bind(fmt_opt_ts(patch.short_video_added_at)?)
        .bind(fmt_opt_ts(patch.long_video_added_at)?)
        .bind(fmt_opt_ts(patch.last_embedded_at)?)
        .bind(fmt_ts(OffsetDateTime::now_utc())?)
        .bind(&item_id)
        .execute(&mut *tx)
        .await
        .map_err(database)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("content item {}", id)));
        }

        for (key, provider_id) in &patch.social_post_ids {
            sqlx::query(
                r#"
                INSERT INTO item_social_refs (item_id, ref_key, provider_id)
                VALUES (?, ?, ?)
                ON CONFLICT(item_id, ref_key) DO UPDATE SET
                    provider_id = excluded.provider_id
                "#,
            )
            .bind(&item_id)
            .bind(key)
            .bind(provider_id)
            .execute(&mut *tx)
            .await
            .map_err(database)?;
        }
        for stage in &patch.clear_issues {
            sqlx::query("DELETE FROM item_issues WHERE item_id = ? AND stage = ?")
                .bind(&item_id)
                .bind(stage.as_str())
                .execute(&mut *tx)
                .await
                .map_err(database)?;
        }
        for (stage, issue) in &patch.set_issues {
            sqlx::query(
                r#"
                INSERT INTO item_issues (item_id, stage, kind, message, recorded_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(item_id, stage) DO UPDATE SET
                    kind = excluded.kind,
                    message = excluded.message,
                    recorded_at = excluded.recorded_at
                "#,
            )
            .bind(&item_id)
            .bind(stage.as_str())
            .bind(issue.kind.as_str())
            .bind(&issue.message)
            .bind(fmt_ts(issue.recorded_at)?)
            .execute(&mut *tx)
            .await
            .map_err(database)?;
        }

        tx.commit().await.map_err(database)?;

        self.get_item(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("content item {}", id)))
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        let item_id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(database)?;

        for table in [
            "item_social_refs",
            "item_issues",
            "blog_posts",
            "content_images",
            "social_posts",
            "videos",
            "podcasts",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE item_id = ?", table))
                .bind(&item_id)
                .execute(&mut *tx)
                .await
                .map_err(database)?;
        }
        let result = sqlx::query("DELETE FROM content_items WHERE id = ?")
            .bind(&item_id)
            .execute(&mut *tx)
            .await
            .map_err(database)?;

        tx.commit().await.map_err(database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_blog_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO blog_posts
            (item_id, title, slug, html, excerpt, meta_description,
             wordpress_post_id, wordpress_url, schema_json, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                title = excluded.title,
                slug = excluded.slug,
                html = excluded.html,
                excerpt = excluded.excerpt,
                meta_description = excluded.meta_description,
                wordpress_post_id = COALESCE(excluded.wordpress_post_id, blog_posts.wordpress_post_id),
                wordpress_url = COALESCE(excluded.wordpress_url, blog_posts.wordpress_url),
                schema_json = COALESCE(excluded.schema_json, blog_posts.schema_json),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(post.item_id.to_string())
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.html)
        .bind(&post.excerpt)
        .bind(&post.meta_description)
        .bind(post.wordpress_post_id.map(|id| id as i64))
        .bind(&post.wordpress_url)
        .bind(&post.schema_json)
        .bind(fmt_ts(post.updated_at)?)
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn get_blog_post(&self, item_id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        let row: Option<(
            String,
            String,
            String,
            String,
            String,
            Option<i64>,
            Option<String>,
            Option<String>,
            String,
        )> = sqlx::query_as(
            r#"
            SELECT title, slug, html, excerpt, meta_description,
                   wordpress_post_id, wordpress_url, schema_json, updated_at
            FROM blog_posts
            WHERE item_id = ?
            "#,
        )
        .bind(item_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(database)?;

        match row {
            Some((
                title,
                slug,
                html,
                excerpt,
                meta_description,
                wordpress_post_id,
                wordpress_url,
                schema_json,
                updated_at,
            )) => Ok(Some(BlogPost {
                item_id,
                title,
                slug,
                html,
                excerpt,
                meta_description,
                wordpress_post_id: wordpress_post_id.map(|id| id as u64),
                wordpress_url,
                schema_json,
                updated_at: parse_ts(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    async fn add_images(&self, images: &[ContentImage]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(database)?;
        for image in images {
            sqlx::query(
                r#"
                INSERT INTO content_images (id, item_id, url, alt_text, source, featured)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(image.id.to_string())
            .bind(image.item_id.to_string())
            .bind(&image.url)
            .bind(&image.alt_text)
            .bind(image.source.as_str())
            .bind(image.featured)
            .execute(&mut *tx)
            .await
            .map_err(database)?;
        }
        tx.commit().await.map_err(database)?;
        Ok(())
    }

    async fn list_images(&self, item_id: Uuid) -> Result<Vec<ContentImage>, StoreError> {
        let rows: Vec<(String, String, String, String, bool)> = sqlx::query_as(
            r#"
            SELECT id, url, alt_text, source, featured
            FROM content_images
            WHERE item_id = ?
            ORDER BY seq
            "#,
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;

        rows.into_iter()
            .map(|(id, url, alt_text, source, featured)| {
                Ok(ContentImage {
                    id: parse_id(&id)?,
                    item_id,
                    url,
                    alt_text,
                    source: source.parse().map_err(serialization)?,
                    featured,
                })
            })
            .collect()
    }

    async fn save_social_post(&self, post: &SocialPost) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO social_posts
            (id, item_id, owner, platform, media, status, caption,
             provider_post_id, published_url, error_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                caption = excluded.caption,
                provider_post_id = excluded.provider_post_id,
                published_url = excluded.published_url,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(post.id.to_string())
        .bind(post.item_id.to_string())
        .bind(post.owner.as_str())
        .bind(post.platform.as_str())
        .bind(post.media.as_str())
        .bind(post.status.as_str())
        .bind(&post.caption)
        .bind(&post.provider_post_id)
        .bind(&post.published_url)
        .bind(&post.error_message)
        .bind(fmt_ts(post.created_at)?)
        .bind(fmt_ts(post.updated_at)?)
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn list_social_posts(&self, item_id: Uuid) -> Result<Vec<SocialPost>, StoreError> {
        let rows = sqlx::query("SELECT * FROM social_posts WHERE item_id = ? ORDER BY created_at")
            .bind(item_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;
        rows.iter().map(Self::social_from_row).collect()
    }

    async fn list_processing_social_posts(&self) -> Result<Vec<SocialPost>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM social_posts
            WHERE status = 'processing' AND provider_post_id IS NOT NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;
        rows.iter().map(Self::social_from_row).collect()
    }

    async fn save_video(&self, video: &Video) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO videos
            (id, item_id, kind, status, provider_job_id, video_url, thumbnail_url,
             duration_secs, error_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                provider_job_id = excluded.provider_job_id,
                video_url = excluded.video_url,
                thumbnail_url = excluded.thumbnail_url,
                duration_secs = excluded.duration_secs,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(video.id.to_string())
        .bind(video.item_id.to_string())
        .bind(video.kind.as_str())
        .bind(video.status.as_str())
        .bind(&video.provider_job_id)
        .bind(&video.video_url)
        .bind(&video.thumbnail_url)
        .bind(video.duration_secs.map(i64::from))
        .bind(&video.error_message)
        .bind(fmt_ts(video.created_at)?)
        .bind(fmt_ts(video.updated_at)?)
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn list_videos(&self, item_id: Uuid) -> Result<Vec<Video>, StoreError> {
        let rows = sqlx::query("SELECT * FROM videos WHERE item_id = ? ORDER BY created_at")
            .bind(item_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;
        rows.iter().map(Self::video_from_row).collect()
    }

    async fn list_processing_videos(&self) -> Result<Vec<Video>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM videos
            WHERE status = 'processing' AND provider_job_id IS NOT NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;
        rows.iter().map(Self::video_from_row).collect()
    }

    async fn save_podcast(&self, podcast: &Podcast) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO podcasts
            (item_id, status, title, description, audio_url, duration_secs,
             episode_id, episode_url, player_url, error_message, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                status = excluded.status,
                title = excluded.title,
                description = excluded.description,
                audio_url = excluded.audio_url,
                duration_secs = excluded.duration_secs,
                episode_id = excluded.episode_id,
                episode_url = excluded.episode_url,
                player_url = excluded.player_url,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(podcast.item_id.to_string())
        .bind(podcast.status.as_str())
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.audio_url)
        .bind(podcast.duration_secs.map(i64::from))
        .bind(&podcast.episode_id)
        .bind(&podcast.episode_url)
        .bind(&podcast.player_url)
        .bind(&podcast.error_message)
        .bind(fmt_ts(podcast.updated_at)?)
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn get_podcast(&self, item_id: Uuid) -> Result<Option<Podcast>, StoreError> {
        let row = sqlx::query("SELECT * FROM podcasts WHERE item_id = ?")
            .bind(item_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row.try_get("status").map_err(database)?;
        let duration: Option<i64> = row.try_get("duration_secs").map_err(database)?;
        let updated_at: String = row.try_get("updated_at").map_err(database)?;

        Ok(Some(Podcast {
            item_id,
            status: status.parse().map_err(serialization)?,
            title: row.try_get("title").map_err(database)?,
            description: row.try_get("description").map_err(database)?,
            audio_url: row.try_get("audio_url").map_err(database)?,
            duration_secs: duration.map(|d| d as u32),
            episode_id: row.try_get("episode_id").map_err(database)?,
            episode_url: row.try_get("episode_url").map_err(database)?,
            player_url: row.try_get("player_url").map_err(database)?,
            error_message: row.try_get("error_message").map_err(database)?,
            updated_at: parse_ts(&updated_at)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paa_pipeline_domain::{
        ContentStatus, ImageSource, IssueKind, PostOwner, SocialMedia, SocialPlatform,
        SocialPostStatus, StageKind, VideoKind, VideoStatus,
    };
    use time::macros::datetime;

    fn item(question: &str) -> ContentItem {
        ContentItem::scheduled(
            "acme",
            question,
            ServiceLocation::new("Seattle", "WA"),
            datetime!(2026-03-03 09:00 UTC),
            datetime!(2026-03-01 09:00 UTC),
        )
    }

    #[tokio::test]
    async fn test_item_roundtrip() {
        let store = SqliteContentStore::in_memory().await.unwrap();
        let item = item("How long does windshield replacement take?");

        store.insert_item(&item).await.unwrap();
        let loaded = store.get_item(item.id).await.unwrap().unwrap();

        assert_eq!(loaded, item);
    }

    #[tokio::test]
    async fn test_duplicate_topic_is_a_conflict() {
        let store = SqliteContentStore::in_memory().await.unwrap();
        store
            .insert_item(&item("Can a chipped windshield be repaired?"))
            .await
            .unwrap();

        let err = store
            .insert_item(&item("  can a chipped windshield be repaired?"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_patch_is_column_wise() {
        let store = SqliteContentStore::in_memory().await.unwrap();
        let item = item("Does insurance cover windshield replacement?");
        store.insert_item(&item).await.unwrap();
        let now = datetime!(2026-03-03 10:00 UTC);

        store
            .update_item(
                item.id,
                &ItemPatch {
                    blog_generated: Some(true),
                    wordpress_post_id: Some(42),
                    wordpress_url: Some("https://acme.test/blog/insurance".to_string()),
                    social_post_ids: vec![("client:facebook".to_string(), "late-1".to_string())],
                    ..ItemPatch::new().issue(
                        StageKind::Social,
                        StageIssue::new(IssueKind::Failed, "account disconnected", now),
                    )
                },
            )
            .await
            .unwrap();

        let updated = store
            .update_item(
                item.id,
                &ItemPatch {
                    podcast_generated: Some(true),
                    social_post_ids: vec![("directory:facebook".to_string(), "late-2".to_string())],
                    ..ItemPatch::new()
                        .status(ContentStatus::Review)
                        .clear_issue(StageKind::Social)
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ContentStatus::Review);
        assert!(updated.flags.blog_generated);
        assert!(updated.flags.podcast_generated);
        assert!(!updated.flags.schema_generated);
        assert_eq!(updated.refs.wordpress_post_id, Some(42));
        assert_eq!(updated.refs.social_post_ids.len(), 2);
        assert!(updated.issues.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let store = SqliteContentStore::in_memory().await.unwrap();
        let err = store
            .update_item(Uuid::new_v4(), &ItemPatch::new().status(ContentStatus::Review))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_items_filters_due() {
        let store = SqliteContentStore::in_memory().await.unwrap();
        let due = item("When should a windshield be replaced?");
        let mut later = item("What is ADAS calibration?");
        later.scheduled_at = datetime!(2026-03-10 09:00 UTC);
        store.insert_item(&later).await.unwrap();
        store.insert_item(&due).await.unwrap();

        let all = store.list_items(&ItemFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![due.id, later.id]
        );

        let listed = store
            .list_items(&ItemFilter {
                status: Some(ContentStatus::Scheduled),
                due_before: Some(datetime!(2026-03-05 00:00 UTC)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, due.id);
    }

    #[tokio::test]
    async fn test_child_records_and_processing_queries() {
        let store = SqliteContentStore::in_memory().await.unwrap();
        let item = item("Is it safe to drive with a cracked windshield?");
        store.insert_item(&item).await.unwrap();
        let now = datetime!(2026-03-03 10:00 UTC);

        let mut post = SocialPost::scheduled(
            item.id,
            PostOwner::Client,
            SocialPlatform::Facebook,
            SocialMedia::Image,
            "Cracked?",
            now,
        );
        post.mark_processing("late-9", now).unwrap();
        store.save_social_post(&post).await.unwrap();

        let video = Video::processing(item.id, VideoKind::Short, "job-3", now);
        store.save_video(&video).await.unwrap();

        store
            .add_images(&[ContentImage {
                id: Uuid::new_v4(),
                item_id: item.id,
                url: "https://img.test/1.png".to_string(),
                alt_text: "crack".to_string(),
                source: ImageSource::Generated,
                featured: true,
            }])
            .await
            .unwrap();

        let posts = store.list_processing_social_posts().await.unwrap();
        assert_eq!(posts, vec![post.clone()]);
        let videos = store.list_processing_videos().await.unwrap();
        assert_eq!(videos[0].status, VideoStatus::Processing);
        assert_eq!(videos[0].provider_job_id.as_deref(), Some("job-3"));

        post.mark_published("https://facebook.com/p/9", now).unwrap();
        store.save_social_post(&post).await.unwrap();
        assert!(store.list_processing_social_posts().await.unwrap().is_empty());
        assert_eq!(
            store.list_social_posts(item.id).await.unwrap()[0].status,
            SocialPostStatus::Published
        );

        assert!(store.delete_item(item.id).await.unwrap());
        assert!(store.list_videos(item.id).await.unwrap().is_empty());
        assert!(store.list_images(item.id).await.unwrap().is_empty());
        assert!(!store.delete_item(item.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("paa.db");
        let item = item("How much does windshield repair cost?");

        {
            let store = SqliteContentStore::new(&path).await.unwrap();
            store.insert_item(&item).await.unwrap();
        }

        let store = SqliteContentStore::new(&path).await.unwrap();
        assert!(store.get_item(item.id).await.unwrap().is_some());
    }
}
