//! Command implementations

pub mod config;
pub mod doctor;
pub mod item;
pub mod items;
pub mod pipeline;
pub mod reconcile;
pub mod schedule;
pub mod serve;
pub mod video;

use anyhow::Result;
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
