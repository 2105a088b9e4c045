//! Raw document repository.

use crate::error::MetadataResult;
use crate::models::DocumentRow;
use async_trait::async_trait;

/// Repository for untyped JSON documents with optimistic revisions.
///
/// Documents are keyed by `(doc_type, doc_id)`. Every successful write
/// returns a fresh revision token; writes that name a revision fail with
/// `Conflict` when it is stale.
#[async_trait]
pub trait DocumentRepo: Send + Sync {
    /// Insert a new document and return its first revision.
    ///
    /// Fails with `AlreadyExists` if the identifier is taken.
    async fn create(
        &self,
        doc_type: &str,
        doc_id: &str,
        body: &serde_json::Value,
    ) -> MetadataResult<String>;

    /// Replace a document's body if `rev` is current and return the new revision.
    async fn update(
        &self,
        doc_type: &str,
        doc_id: &str,
        rev: &str,
        body: &serde_json::Value,
    ) -> MetadataResult<String>;

    /// Delete a document.
    ///
    /// With `rev` set, the delete only applies to that revision. Without
    /// it the delete is unconditional, which is what rollback uses when
    /// the revision of a half-created record is unknown.
    async fn delete(&self, doc_type: &str, doc_id: &str, rev: Option<&str>)
    -> MetadataResult<()>;

    /// Fetch a document.
    async fn get(&self, doc_type: &str, doc_id: &str) -> MetadataResult<Option<DocumentRow>>;

    /// Count documents of a type.
    async fn count(&self, doc_type: &str) -> MetadataResult<u64>;
}
