//! The stash file write path.
//!
//! This crate provides:
//! - `ChecksumStream`, a copy that hashes every byte it forwards
//! - `PathAllocator`, which derives fresh storage paths
//! - `ContentWriter` and `MetadataWriter`, one per store
//! - `FileUploader`, which runs an upload end to end and rolls back
//!   whichever store was written when the other one fails
//! - Read-back verification of stored content

pub mod allocator;
pub mod checksum;
pub mod error;
pub mod metadata;
pub mod upload;
pub mod verify;
pub mod writer;

pub use allocator::PathAllocator;
pub use checksum::{Checksum, ChecksumStream};
pub use error::{UploadError, UploadResult};
pub use metadata::MetadataWriter;
pub use upload::{FileUploader, UploadState, parse_declared_digest};
pub use verify::{VerifyReport, VerifyStatus, verify_record};
pub use writer::ContentWriter;
