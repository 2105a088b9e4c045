//! Persistable document abstraction.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A record that can be persisted in the document store.
///
/// Each record kind has exactly one implementing type. `Clone` provides
/// the deep copy used when a caller needs to keep the pre-persist state.
pub trait Doc: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Qualified identifier (`"<doctype>/<uuid>"`), empty before create.
    fn id(&self) -> &str;

    /// Revision token, empty before create.
    fn rev(&self) -> &str;

    /// Document type tag.
    fn doc_type(&self) -> &'static str;

    fn set_id(&mut self, id: String);

    fn set_rev(&mut self, rev: String);
}

/// Build a qualified identifier for a new document of `doc_type`.
pub fn new_qualified_id(doc_type: &str) -> String {
    format!("{doc_type}/{}", uuid::Uuid::new_v4().simple())
}

/// Strip the doctype prefix from a qualified identifier.
pub fn short_id(qualified: &str) -> &str {
    match qualified.find('/') {
        Some(idx) => &qualified[idx + 1..],
        None => qualified,
    }
}
