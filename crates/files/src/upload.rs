//! The create-file-and-upload operation.
//!
//! An upload touches two stores that share no transaction: the content
//! store holding the bytes and the document store holding the record.
//! The orchestrator runs the steps in order and, when a later step fails,
//! compensates the earlier ones so that no record points at missing
//! content and no content is left without a record.

use crate::allocator::PathAllocator;
use crate::error::{UploadError, UploadResult};
use crate::metadata::MetadataWriter;
use crate::verify::{VerifyReport, verify_record};
use crate::writer::ContentWriter;
use stash_core::config::UploadConfig;
use stash_core::{Doc, DocKind, FileDigest, FileRecord, UploadRequest};
use stash_metadata::{DocumentRepo, DocumentStore, ErrorKind, MetadataError, MetadataResult};
use stash_storage::{ContentStore, StorageError, StorageResult};
use std::fmt;
use std::sync::Arc;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Steps of a single upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    Validating,
    PathAllocated,
    ContentWritten,
    DigestVerified,
    MetadataPersisted,
    RollbackContent,
    RollbackMetadata,
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::PathAllocated => "path_allocated",
            Self::ContentWritten => "content_written",
            Self::DigestVerified => "digest_verified",
            Self::MetadataPersisted => "metadata_persisted",
            Self::RollbackContent => "rollback_content",
            Self::RollbackMetadata => "rollback_metadata",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a client-declared MD5 given as 32 hex characters or base64.
///
/// An empty string means no digest was declared. Anything that does not
/// decode to exactly 16 bytes is rejected.
pub fn parse_declared_digest(raw: &str) -> UploadResult<Option<FileDigest>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let parsed = if raw.len() == 32 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        FileDigest::from_hex(raw)
    } else {
        FileDigest::from_base64(raw)
    };
    parsed
        .map(Some)
        .map_err(|e| UploadError::Validation(format!("declared digest: {e}")))
}

/// Tracks the state of one upload and logs every transition.
struct UploadRun {
    upload_id: Uuid,
    state: UploadState,
}

impl UploadRun {
    fn start() -> Self {
        let run = Self {
            upload_id: Uuid::new_v4(),
            state: UploadState::Validating,
        };
        tracing::debug!(upload_id = %run.upload_id, state = %run.state, "Upload started");
        run
    }

    fn enter(&mut self, next: UploadState) {
        tracing::debug!(
            upload_id = %self.upload_id,
            from = %self.state,
            to = %next,
            "Upload state transition"
        );
        self.state = next;
    }
}

/// Runs uploads against a content store and a document store.
pub struct FileUploader {
    content: Arc<dyn ContentStore>,
    documents: Arc<dyn DocumentStore>,
    allocator: PathAllocator,
    writer: ContentWriter,
    metadata: MetadataWriter,
    namespace: String,
}

impl FileUploader {
    pub fn new(
        content: Arc<dyn ContentStore>,
        documents: Arc<dyn DocumentStore>,
        config: &UploadConfig,
    ) -> Self {
        Self {
            allocator: PathAllocator::with_max_attempts(
                content.clone(),
                config.max_allocation_attempts,
            ),
            writer: ContentWriter::with_buffer_size(content.clone(), config.stream_buffer_size),
            metadata: MetadataWriter::new(documents.clone()),
            namespace: config.namespace.clone(),
            content,
            documents,
        }
    }

    pub fn document_store(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    /// Store `body` as a new file and create its record.
    ///
    /// On success both the object and the record exist and the returned
    /// record carries its identifier and revision. On failure the error of
    /// the step that failed is returned; the side effects of earlier steps
    /// have been undone, except where removing the content could leave a
    /// committed record pointing at nothing.
    pub async fn create_file_and_upload<R>(
        &self,
        request: &UploadRequest,
        body: R,
    ) -> UploadResult<FileRecord>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut run = UploadRun::start();

        if request.kind != DocKind::File {
            run.enter(UploadState::Failed);
            return Err(UploadError::Validation(format!(
                "cannot upload content for a {}",
                request.kind
            )));
        }

        let path = match self.allocator.allocate(request, &self.namespace).await {
            Ok(path) => path,
            Err(e) => {
                run.enter(UploadState::Failed);
                return Err(e);
            }
        };
        run.enter(UploadState::PathAllocated);

        let checksum = match self.writer.write(&path, body).await {
            Ok(checksum) => checksum,
            // The object at `path`, if any, belongs to someone else.
            Err(e @ (UploadError::Conflict(_) | UploadError::Allocation(_))) => {
                run.enter(UploadState::Failed);
                return Err(e);
            }
            Err(e) => {
                self.compensate_content(&mut run, &path, &e).await;
                return Err(e);
            }
        };
        run.enter(UploadState::ContentWritten);

        if let Some(expected) = request.declared_digest
            && expected != checksum.digest
        {
            let e = UploadError::Integrity {
                expected,
                actual: checksum.digest,
            };
            self.compensate_content(&mut run, &path, &e).await;
            return Err(e);
        }
        run.enter(UploadState::DigestVerified);

        let mut record = self.metadata.build(request, &path, &checksum);
        if let Err(e) = self.metadata.persist(&mut record).await {
            self.compensate_metadata(&mut run, &record, &e).await;
            return Err(e);
        }
        run.enter(UploadState::MetadataPersisted);

        tracing::info!(
            upload_id = %run.upload_id,
            id = %record.id,
            path = %record.path,
            size = record.attributes.size,
            "File uploaded"
        );
        Ok(record)
    }

    /// Check that the content behind `record` still matches it.
    pub async fn verify(&self, record: &FileRecord) -> UploadResult<VerifyReport> {
        verify_record(self.content.as_ref(), record).await
    }

    /// Remove the object at `path`. An absent object counts as removed.
    pub async fn discard_content(&self, path: &str) -> StorageResult<()> {
        match self.content.remove(path).await {
            Err(StorageError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    /// Delete `record` regardless of its revision. An absent record counts
    /// as deleted, as does a record that never received an identifier.
    pub async fn discard_record(&self, record: &FileRecord) -> MetadataResult<()> {
        if record.id.is_empty() {
            return Ok(());
        }
        match self
            .documents
            .delete(record.doc_type(), &record.id, None)
            .await
        {
            Err(MetadataError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn compensate_content(&self, run: &mut UploadRun, path: &str, cause: &UploadError) {
        run.enter(UploadState::RollbackContent);
        self.remove_logged(run, path, cause).await;
        run.enter(UploadState::Failed);
    }

    /// Undo the content write after the record could not be persisted.
    ///
    /// A store-side failure may still have committed the record, so the
    /// record is deleted first and the object is only removed once no
    /// record can reference it. If that delete fails the object is kept and
    /// the pair is logged for reconciliation. A failure before the store
    /// was reached removes the object and deletes the record best-effort.
    async fn compensate_metadata(
        &self,
        run: &mut UploadRun,
        record: &FileRecord,
        cause: &UploadError,
    ) {
        let kind = match cause {
            UploadError::Persistence(e) => e.kind(),
            _ => ErrorKind::Generic,
        };

        match (kind, cause) {
            // The id is taken by a record that is not ours.
            (_, UploadError::Persistence(MetadataError::AlreadyExists(_))) => {
                run.enter(UploadState::RollbackContent);
                self.remove_logged(run, &record.path, cause).await;
            }
            (ErrorKind::Store, _) => {
                run.enter(UploadState::RollbackMetadata);
                match self.discard_record(record).await {
                    Ok(()) => {
                        run.enter(UploadState::RollbackContent);
                        self.remove_logged(run, &record.path, cause).await;
                    }
                    Err(e) => {
                        tracing::error!(
                            upload_id = %run.upload_id,
                            id = %record.id,
                            path = %record.path,
                            error = %e,
                            cause = %cause,
                            "Failed to delete file record; keeping content for reconciliation"
                        );
                    }
                }
            }
            (ErrorKind::Generic, _) => {
                run.enter(UploadState::RollbackContent);
                self.remove_logged(run, &record.path, cause).await;
                run.enter(UploadState::RollbackMetadata);
                if let Err(e) = self.discard_record(record).await {
                    tracing::warn!(
                        upload_id = %run.upload_id,
                        id = %record.id,
                        error = %e,
                        cause = %cause,
                        "Failed to delete file record during rollback"
                    );
                }
            }
        }

        run.enter(UploadState::Failed);
    }

    async fn remove_logged(&self, run: &UploadRun, path: &str, cause: &UploadError) {
        if let Err(e) = self.discard_content(path).await {
            tracing::warn!(
                upload_id = %run.upload_id,
                path = %path,
                error = %e,
                cause = %cause,
                "Failed to remove content during rollback"
            );
        }
    }
}
