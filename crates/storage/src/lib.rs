//! Content store abstraction and backends for stash.
//!
//! This crate provides:
//! - The `ContentStore` trait with create-exclusive writes
//! - Streaming uploads and reads
//! - A local filesystem backend

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::{ByteStream, ContentStore, ObjectMeta, StreamingUpload};

use stash_core::config::StorageConfig;
use std::sync::Arc;

/// Create a content store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ContentStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            tracing::debug!(root = %path.display(), "Filesystem content store ready");
            Ok(Arc::new(backend))
        }
    }
}
