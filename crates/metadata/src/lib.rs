//! Document store abstraction and implementations for stash.
//!
//! This crate provides the metadata side of the write path:
//! - A raw JSON document repository with optimistic revisions
//! - Typed `Doc` operations on top of it
//! - A SQLite backend

pub mod error;
pub mod ext;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{ErrorKind, MetadataError, MetadataResult};
pub use ext::DocumentStoreExt;
pub use repos::DocumentRepo;
pub use store::{DocumentStore, SqliteStore};

use stash_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a document store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn DocumentStore>> {
    config.validate().map_err(MetadataError::Config)?;

    match config {
        MetadataConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *busy_timeout_secs).await?;
            tracing::debug!(path = %path.display(), "SQLite document store ready");
            Ok(Arc::new(store) as Arc<dyn DocumentStore>)
        }
    }
}
