//! Core domain types for the stash file write path.
//!
//! This crate defines the data model shared by the other crates:
//! - File digests and incremental hashing
//! - Upload requests and file records
//! - The persistable document abstraction
//! - Configuration

pub mod config;
pub mod digest;
pub mod doc;
pub mod error;
pub mod file;

pub use config::StashConfig;
pub use digest::{DigestHasher, FileDigest};
pub use doc::Doc;
pub use error::{Error, Result};
pub use file::{DocKind, FILES_DOC_TYPE, FileAttributes, FileRecord, UploadRequest};
