//! File records and upload requests.

use crate::digest::FileDigest;
use crate::doc::{self, Doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Document type tag for file records.
pub const FILES_DOC_TYPE: &str = "stash.files";

/// Placeholder classification assigned at upload time.
pub const DEFAULT_CLASS: &str = "document";

/// Placeholder mime type assigned at upload time.
pub const DEFAULT_MIME: &str = "text/plain";

/// Kind of document an upload request declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    File,
    Folder,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied description of a file to upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Logical file name.
    pub name: String,
    /// Parent folder identifier.
    #[serde(default)]
    pub folder_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub executable: bool,
    /// Digest the caller expects the content to have, if known.
    #[serde(default)]
    pub declared_digest: Option<FileDigest>,
    /// Declared document kind. Only `File` can be uploaded.
    pub kind: DocKind,
}

impl UploadRequest {
    /// Start a request for a regular file.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder_id: String::new(),
            tags: Vec::new(),
            executable: false,
            declared_digest: None,
            kind: DocKind::File,
        }
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = folder_id.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn executable(mut self, executable: bool) -> Self {
        self.executable = executable;
        self
    }

    pub fn with_declared_digest(mut self, digest: Option<FileDigest>) -> Self {
        self.declared_digest = digest;
        self
    }

    pub fn with_kind(mut self, kind: DocKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Descriptive attributes of a stored file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Content size in bytes.
    pub size: u64,
    pub tags: Vec<String>,
    pub md5sum: FileDigest,
    pub executable: bool,
    pub class: String,
    pub mime: String,
}

/// A file's metadata record in the document store.
///
/// Once persisted, `path` and `attributes.md5sum` never change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Qualified identifier, empty until the record is created.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Revision token, empty until the record is created.
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    pub attributes: FileAttributes,
    /// Parent folder identifier.
    pub folder_id: String,
    /// Object path in the content store.
    pub path: String,
}

impl FileRecord {
    /// Create an unpersisted record.
    pub fn new(attributes: FileAttributes, folder_id: String, path: String) -> Self {
        Self {
            id: String::new(),
            rev: String::new(),
            attributes,
            folder_id,
            path,
        }
    }

    /// Identifier without the doctype prefix.
    pub fn short_id(&self) -> &str {
        doc::short_id(&self.id)
    }

    /// Whether the record has been created in the document store.
    pub fn is_persisted(&self) -> bool {
        !self.rev.is_empty()
    }
}

impl Doc for FileRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn rev(&self) -> &str {
        &self.rev
    }

    fn doc_type(&self) -> &'static str {
        FILES_DOC_TYPE
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn set_rev(&mut self, rev: String) {
        self.rev = rev;
    }
}
