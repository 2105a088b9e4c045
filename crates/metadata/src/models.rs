//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// A stored document with its bookkeeping columns.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub doc_type: String,
    pub doc_id: String,
    pub rev: String,
    /// JSON body without `_rev`.
    pub body: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Build a revision token for the given generation.
pub fn new_rev(generation: u64) -> String {
    format!("{generation}-{}", uuid::Uuid::new_v4().simple())
}

/// Extract the generation from a revision token.
pub fn rev_generation(rev: &str) -> Option<u64> {
    rev.split_once('-').and_then(|(generation, _)| generation.parse().ok())
}
