//! Exclusive object creation fed by the checksum stream.

use crate::checksum::{Checksum, ChecksumStream};
use crate::error::{UploadError, UploadResult};
use stash_core::config::DEFAULT_STREAM_BUFFER_SIZE;
use stash_storage::{ContentStore, StorageError};
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Writes an upload body to a freshly created object.
///
/// Never deletes anything: on failure the partially written object, if
/// any, stays at `path` for the caller to compensate.
pub struct ContentWriter {
    store: Arc<dyn ContentStore>,
    buffer_size: usize,
}

impl ContentWriter {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_buffer_size(store, DEFAULT_STREAM_BUFFER_SIZE)
    }

    pub fn with_buffer_size(store: Arc<dyn ContentStore>, buffer_size: usize) -> Self {
        Self { store, buffer_size }
    }

    /// Create the object at `path` and stream `body` into it.
    ///
    /// Returns `Conflict` when an object already exists at `path`. The
    /// upload handle is finished on success and aborted otherwise.
    pub async fn write<R>(&self, path: &str, body: R) -> UploadResult<Checksum>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut upload = self.store.create_exclusive(path).await.map_err(|e| match e {
            StorageError::InvalidKey(msg) => UploadError::Allocation(msg),
            other => other.into(),
        })?;

        let stream = ChecksumStream::with_buffer_size(body, self.buffer_size);
        let checksum = match stream.copy_to(upload.as_mut()).await {
            Ok(checksum) => checksum,
            Err(e) => {
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!(
                        path = %path,
                        error = %abort_err,
                        "Failed to close upload handle after write failure"
                    );
                }
                return Err(e);
            }
        };

        let written = upload.finish().await?;
        if written != checksum.size {
            return Err(UploadError::Io(std::io::Error::other(format!(
                "short write to {path}: streamed {} bytes, store reports {written}",
                checksum.size
            ))));
        }

        tracing::debug!(
            path = %path,
            size = checksum.size,
            digest = %checksum.digest,
            "Content written"
        );
        Ok(checksum)
    }
}
