//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// paa-pipeline: produce and publish PAA blog, podcast, video and social content
#[derive(Parser, Debug)]
#[command(name = "paa-pipeline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the content pipeline for one item or for everything due
    Pipeline(PipelineArgs),

    /// Poll providers for in-flight social posts and videos
    Reconcile(ReconcileArgs),

    /// Rewrite the published post with every available media embed
    Embed(ItemArg),

    /// Regenerate the JSON-LD schema for an item
    Schema(ItemArg),

    /// Narrate and publish the podcast episode for an item
    Podcast(ItemArg),

    /// Long-form video operations
    Video(VideoArgs),

    /// Generate the publishing calendar for a client
    Schedule(ScheduleArgs),

    /// Inspect and manage content items
    Items(ItemsArgs),

    /// Serve the HTTP trigger API
    Serve(ServeArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Content item to process
    #[arg(long, conflicts_with = "all_due", required_unless_present = "all_due")]
    pub item: Option<Uuid>,

    /// Process every scheduled item whose time has come
    #[arg(long)]
    pub all_due: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Only refresh this item
    #[arg(long, conflicts_with = "watch")]
    pub item: Option<Uuid>,

    /// Keep sweeping until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ItemArg {
    /// Content item id
    #[arg(long)]
    pub item: Uuid,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct VideoArgs {
    #[command(subcommand)]
    pub command: VideoCommands,
}

#[derive(Subcommand, Debug)]
pub enum VideoCommands {
    /// Upload a long-form video file to YouTube and embed it
    Upload {
        /// Content item id
        #[arg(long)]
        item: Uuid,

        /// Video file to upload
        #[arg(long)]
        file: PathBuf,

        /// Video title
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// public, unlisted or private
        #[arg(long, default_value = "public")]
        privacy: String,
    },
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Create items for every question × location the client lacks
    Generate {
        /// Client id from the configuration
        #[arg(long)]
        client: String,

        /// First eligible date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ItemsArgs {
    #[command(subcommand)]
    pub command: ItemsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ItemsCommands {
    /// List content items
    List {
        #[arg(long)]
        client: Option<String>,

        /// draft, scheduled, generating, review, approved, published or failed
        #[arg(long)]
        status: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Schedule a single item by hand
    Add {
        #[arg(long)]
        client: String,

        #[arg(long)]
        question: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        neighborhood: Option<String>,

        /// RFC 3339 publish time, defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete an item that has not reached review
    Delete {
        #[arg(long)]
        item: Uuid,
    },

    /// Approve an item in review
    Approve {
        #[arg(long)]
        item: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration after file and environment layering
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
