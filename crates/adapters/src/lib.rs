//! paa-pipeline adapters crate
//!
//! Infrastructure adapters implementing the domain ports:
//! - `state`: SQLite and in-memory content stores
//! - `wordpress`, `getlate`, `podbean`, `video_api`, `photos`: third-party services
//! - `generator_http`: the content-generation service client
//! - `stub`: deterministic offline adapters
//! - `registry`: per-client wiring of all of the above

mod http;
mod state_memory;
mod state_sqlite;

pub mod generator_http;
pub mod getlate;
pub mod photos;
pub mod podbean;
pub mod registry;
pub mod stub;
pub mod video_api;
pub mod wordpress;

pub use http::DEFAULT_TIMEOUT;

/// Re-exports for content store adapters
pub mod state {
    pub use crate::state_memory::InMemoryContentStore;
    pub use crate::state_sqlite::SqliteContentStore;
}
