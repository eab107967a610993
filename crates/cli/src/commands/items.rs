//! Items command - list, add, delete and approve content items

use anyhow::{Context, Result, bail};
use paa_pipeline_domain::{
    ClientServices, ContentItem, ContentStatus, ContentStore, ItemFilter, ServiceLocation,
};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::args::{ItemsArgs, ItemsCommands};
use crate::commands::print_json;
use crate::context::AppContext;

pub async fn execute(args: ItemsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;

    match args.command {
        ItemsCommands::List {
            client,
            status,
            json,
        } => {
            let status = status
                .as_deref()
                .map(str::parse::<ContentStatus>)
                .transpose()
                .context("Invalid --status")?;
            let items = context
                .store
                .list_items(&ItemFilter {
                    client_id: client,
                    status,
                    ..Default::default()
                })
                .await?;

            if json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("No content items");
            }
            for item in &items {
                print_item(item);
            }
            Ok(())
        }

        ItemsCommands::Add {
            client,
            question,
            city,
            state,
            neighborhood,
            at,
        } => {
            if context.services.profile(&client).is_none() {
                bail!("Unknown client: {}", client);
            }

            let now = OffsetDateTime::now_utc();
            let scheduled_at = match at {
                Some(at) => OffsetDateTime::parse(&at, &Rfc3339)
                    .with_context(|| format!("Invalid RFC 3339 time: {}", at))?,
                None => now,
            };
            let location = ServiceLocation {
                city,
                state,
                neighborhood,
            };

            let item = ContentItem::scheduled(client, question, location, scheduled_at, now);
            context
                .store
                .insert_item(&item)
                .await
                .context("Failed to add content item")?;
            tracing::info!(item_id = %item.id, "Added content item");
            println!("{}", item.id);
            Ok(())
        }

        ItemsCommands::Delete { item } => {
            context.pipeline.delete_item(item).await?;
            println!("Deleted {}", item);
            Ok(())
        }

        ItemsCommands::Approve { item } => {
            let item = context.pipeline.approve_item(item).await?;
            println!("{} → {}", item.id, item.status);
            Ok(())
        }
    }
}

fn print_item(item: &ContentItem) {
    let attention = if item.needs_attention() { "!" } else { " " };
    println!(
        "{}{} {:<10} {:<16} {}  {} ({})",
        attention,
        item.id,
        item.status.as_str(),
        item.client_id,
        item.scheduled_at.date(),
        item.paa_question,
        item.location.label()
    );
}
