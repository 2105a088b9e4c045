use async_trait::async_trait;
use bytes::Bytes;
use stash_metadata::models::DocumentRow;
use stash_metadata::{DocumentRepo, DocumentStore, MetadataError, MetadataResult, SqliteStore};
use stash_storage::{
    ByteStream, ContentStore, ObjectMeta, StorageError, StorageResult, StreamingUpload,
};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Content store wrapper counting calls and injecting failures.
#[allow(dead_code)]
pub struct InstrumentedContentStore {
    inner: Arc<dyn ContentStore>,
    pub exists_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    /// Report this many upcoming `exists` checks as taken.
    pub taken_paths: AtomicUsize,
    /// Fail writes once this many chunks have been accepted.
    pub fail_write_after: Mutex<Option<usize>>,
    pub fail_remove: AtomicBool,
    pub fail_exists: AtomicBool,
}

#[allow(dead_code)]
impl InstrumentedContentStore {
    pub fn new(inner: Arc<dyn ContentStore>) -> Self {
        Self {
            inner,
            exists_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            taken_paths: AtomicUsize::new(0),
            fail_write_after: Mutex::new(None),
            fail_remove: AtomicBool::new(false),
            fail_exists: AtomicBool::new(false),
        }
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for InstrumentedContentStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("stat failed")));
        }
        let taken = self
            .taken_paths
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if taken {
            return Ok(true);
        }
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_stream(key).await
    }

    async fn create_exclusive(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.create_exclusive(key).await?;
        let fail_after = *self.fail_write_after.lock().unwrap();
        Ok(Box::new(FaultyUpload {
            inner,
            chunks: 0,
            fail_after,
        }))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("unlink failed")));
        }
        self.inner.remove(key).await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

struct FaultyUpload {
    inner: Box<dyn StreamingUpload>,
    chunks: usize,
    fail_after: Option<usize>,
}

#[async_trait]
impl StreamingUpload for FaultyUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        if self.fail_after.is_some_and(|n| self.chunks >= n) {
            return Err(StorageError::Io(std::io::Error::other("no space left")));
        }
        self.chunks += 1;
        self.inner.write(data).await
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        self.inner.finish().await
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.inner.abort().await
    }
}

/// How the next document create should fail.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum CreateFault {
    /// Store error before anything is written.
    Rejected,
    /// The document is committed, then a store error is reported.
    CommittedThenFailed,
    /// Failure before the store is reached.
    Generic,
    /// The store reports that the id is already taken.
    IdTaken,
}

/// Document store wrapper counting calls and injecting failures.
#[allow(dead_code)]
pub struct FaultyDocumentStore {
    inner: SqliteStore,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub create_fault: Mutex<Option<CreateFault>>,
    pub fail_delete: AtomicBool,
}

#[allow(dead_code)]
impl FaultyDocumentStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            create_fault: Mutex::new(None),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_next_create(&self, fault: CreateFault) {
        *self.create_fault.lock().unwrap() = Some(fault);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRepo for FaultyDocumentStore {
    async fn create(
        &self,
        doc_type: &str,
        doc_id: &str,
        body: &serde_json::Value,
    ) -> MetadataResult<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let fault = self.create_fault.lock().unwrap().take();
        match fault {
            None => self.inner.create(doc_type, doc_id, body).await,
            Some(CreateFault::Rejected) => {
                Err(MetadataError::Internal("document store unavailable".into()))
            }
            Some(CreateFault::CommittedThenFailed) => {
                self.inner.create(doc_type, doc_id, body).await?;
                Err(MetadataError::Internal("connection reset after commit".into()))
            }
            Some(CreateFault::Generic) => {
                let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
                Err(MetadataError::Serialization(err))
            }
            Some(CreateFault::IdTaken) => Err(MetadataError::AlreadyExists(doc_id.to_string())),
        }
    }

    async fn update(
        &self,
        doc_type: &str,
        doc_id: &str,
        rev: &str,
        body: &serde_json::Value,
    ) -> MetadataResult<String> {
        self.inner.update(doc_type, doc_id, rev, body).await
    }

    async fn delete(&self, doc_type: &str, doc_id: &str, rev: Option<&str>) -> MetadataResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(MetadataError::Internal("delete timed out".into()));
        }
        self.inner.delete(doc_type, doc_id, rev).await
    }

    async fn get(&self, doc_type: &str, doc_id: &str) -> MetadataResult<Option<DocumentRow>> {
        self.inner.get(doc_type, doc_id).await
    }

    async fn count(&self, doc_type: &str) -> MetadataResult<u64> {
        self.inner.count(doc_type).await
    }
}

#[async_trait]
impl DocumentStore for FaultyDocumentStore {
    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }
}
