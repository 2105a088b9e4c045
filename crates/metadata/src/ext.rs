//! Typed document operations layered over the raw repository.

use crate::error::MetadataResult;
use crate::store::DocumentStore;
use async_trait::async_trait;
use stash_core::Doc;
use stash_core::doc::new_qualified_id;

/// Typed create/update/delete for any [`Doc`].
///
/// Implemented for every `DocumentStore`, including `dyn DocumentStore`.
/// Do not implement it manually.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Create `doc`.
    ///
    /// Assigns a fresh qualified identifier when the doc has none, before
    /// contacting the store, so a failed create still leaves the caller
    /// with the identifier it tried to use. Sets the revision on success.
    async fn create_doc<D: Doc>(&self, doc: &mut D) -> MetadataResult<()>;

    /// Update `doc` at its current revision and store the new revision on it.
    async fn update_doc<D: Doc>(&self, doc: &mut D) -> MetadataResult<()>;

    /// Create the doc if it has never been persisted, update it otherwise.
    async fn save_doc<D: Doc>(&self, doc: &mut D) -> MetadataResult<()>;

    /// Delete `doc` at its current revision, or unconditionally if it has none.
    async fn delete_doc<D: Doc>(&self, doc: &D) -> MetadataResult<()>;

    /// Load a doc by qualified identifier.
    async fn get_doc<D: Doc>(&self, doc_type: &str, id: &str) -> MetadataResult<Option<D>>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {
    async fn create_doc<D: Doc>(&self, doc: &mut D) -> MetadataResult<()> {
        if doc.id().is_empty() {
            doc.set_id(new_qualified_id(doc.doc_type()));
        }
        let body = serde_json::to_value(&*doc)?;
        let id = doc.id().to_string();
        let rev = self.create(doc.doc_type(), &id, &body).await?;
        doc.set_rev(rev);
        Ok(())
    }

    async fn update_doc<D: Doc>(&self, doc: &mut D) -> MetadataResult<()> {
        let body = serde_json::to_value(&*doc)?;
        let id = doc.id().to_string();
        let rev = doc.rev().to_string();
        let next = self.update(doc.doc_type(), &id, &rev, &body).await?;
        doc.set_rev(next);
        Ok(())
    }

    async fn save_doc<D: Doc>(&self, doc: &mut D) -> MetadataResult<()> {
        if doc.id().is_empty() || doc.rev().is_empty() {
            self.create_doc(doc).await
        } else {
            self.update_doc(doc).await
        }
    }

    async fn delete_doc<D: Doc>(&self, doc: &D) -> MetadataResult<()> {
        let rev = Some(doc.rev()).filter(|rev| !rev.is_empty());
        self.delete(doc.doc_type(), doc.id(), rev).await
    }

    async fn get_doc<D: Doc>(&self, doc_type: &str, id: &str) -> MetadataResult<Option<D>> {
        let Some(row) = self.get(doc_type, id).await? else {
            return Ok(None);
        };
        let mut doc: D = serde_json::from_str(&row.body)?;
        doc.set_id(row.doc_id);
        doc.set_rev(row.rev);
        Ok(Some(doc))
    }
}
