//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Byte-addressable object storage keyed by path.
///
/// The store itself provides no cross-object consistency: callers that
/// pair an object with a metadata record own the compensation logic.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's size without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Get an object as a byte stream.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Create a new object and return a handle to write its content.
    ///
    /// Fails with `AlreadyExists` if an object is already present at `key`;
    /// of two concurrent calls for the same key exactly one succeeds. The
    /// object is visible at `key` from the moment this returns, so a
    /// failed write leaves a partial object behind for the caller to
    /// remove.
    async fn create_exclusive(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>>;

    /// Remove an object. Fails with `NotFound` if it is absent.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Get the name of this storage backend.
    ///
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}

/// Write handle for an object being created.
///
/// Dropping the handle closes it. Neither `finish` nor `abort` removes
/// the object.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Flush to durable storage and return the total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Close the handle without finishing the write.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
