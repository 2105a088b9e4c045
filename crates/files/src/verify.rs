//! Read-back verification of stored content against its record.

use crate::error::{UploadError, UploadResult};
use futures::StreamExt;
use stash_core::{FileDigest, FileRecord};
use stash_storage::{ContentStore, StorageError};

/// Outcome of checking one record's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyStatus {
    /// Content matches the recorded digest and size.
    Intact,
    /// No object at the recorded path.
    NotFound,
    /// Object present but its bytes differ from the record.
    Corrupted {
        expected: FileDigest,
        actual: FileDigest,
        expected_size: u64,
        actual_size: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyReport {
    pub id: String,
    pub path: String,
    pub status: VerifyStatus,
}

impl VerifyReport {
    pub fn is_intact(&self) -> bool {
        self.status == VerifyStatus::Intact
    }
}

/// Stream the object behind `record` through the hasher and compare.
pub async fn verify_record(
    store: &dyn ContentStore,
    record: &FileRecord,
) -> UploadResult<VerifyReport> {
    let report = |status: VerifyStatus| VerifyReport {
        id: record.id.clone(),
        path: record.path.clone(),
        status,
    };

    let mut stream = match store.get_stream(&record.path).await {
        Ok(stream) => stream,
        Err(StorageError::NotFound(_)) => return Ok(report(VerifyStatus::NotFound)),
        Err(e) => return Err(UploadError::Storage(e)),
    };

    let mut hasher = FileDigest::hasher();
    let mut size = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(UploadError::Storage)?;
        hasher.update(&chunk);
        size += chunk.len() as u64;
    }
    let actual = hasher.finalize();

    let expected = record.attributes.md5sum;
    let expected_size = record.attributes.size;
    if actual == expected && size == expected_size {
        return Ok(report(VerifyStatus::Intact));
    }

    tracing::warn!(
        id = %record.id,
        path = %record.path,
        expected = %expected,
        actual = %actual,
        "Stored content does not match its record"
    );
    Ok(report(VerifyStatus::Corrupted {
        expected,
        actual,
        expected_size,
        actual_size: size,
    }))
}
