//! Storage Layer
//!
//! Bounded in-memory repository for event logs and session records.

mod repository;

pub use repository::{EventRecord, Repository, SessionRecord};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("record not found")]
    NotFound,
}
