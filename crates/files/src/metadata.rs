//! File record construction and persistence.

use crate::checksum::Checksum;
use crate::error::UploadResult;
use stash_core::file::{DEFAULT_CLASS, DEFAULT_MIME};
use stash_core::{FileAttributes, FileRecord, UploadRequest};
use stash_metadata::{DocumentStore, DocumentStoreExt};
use std::sync::Arc;
use time::OffsetDateTime;

/// Builds file records and commits them to the document store.
pub struct MetadataWriter {
    store: Arc<dyn DocumentStore>,
}

impl MetadataWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record for content written at `path`. Both timestamps are "now".
    pub fn build(&self, request: &UploadRequest, path: &str, checksum: &Checksum) -> FileRecord {
        let now = OffsetDateTime::now_utc();
        let attributes = FileAttributes {
            name: request.name.trim().to_string(),
            created_at: now,
            updated_at: now,
            size: checksum.size,
            tags: request.tags.clone(),
            md5sum: checksum.digest,
            executable: request.executable,
            class: DEFAULT_CLASS.to_string(),
            mime: DEFAULT_MIME.to_string(),
        };
        FileRecord::new(attributes, request.folder_id.clone(), path.to_string())
    }

    /// Create `record` in the document store.
    ///
    /// The identifier is set on `record` before the store is contacted, so
    /// after a failure `record.id` still names the document that may exist.
    pub async fn persist(&self, record: &mut FileRecord) -> UploadResult<()> {
        self.store.create_doc(record).await?;
        tracing::debug!(id = %record.id, rev = %record.rev, "File record persisted");
        Ok(())
    }
}
