//! paa-pipeline domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Content items, child records and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Pipeline orchestration, reconciliation, embedding, scheduling
//! - `policy`: Lifecycle rules enforced at the boundary

pub mod model;
pub mod policy;
pub mod ports;
pub mod usecases;

#[cfg(test)]
pub(crate) mod test_support;

pub use model::*;
pub use ports::*;

use sha2::{Digest, Sha256};

/// Deterministic digest of a composed document.
/// Two compositions with identical inputs produce the same digest.
pub fn document_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
