//! Streaming copy with on-the-fly MD5 computation.

use crate::error::{UploadError, UploadResult};
use bytes::Bytes;
use stash_core::FileDigest;
use stash_core::config::DEFAULT_STREAM_BUFFER_SIZE;
use stash_storage::{StorageError, StreamingUpload};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Digest and byte count of a completed copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checksum {
    pub digest: FileDigest,
    pub size: u64,
}

/// Copies a source into an upload handle, hashing every byte on the way.
///
/// Each buffer is fed to the hasher before it is forwarded, so the digest
/// covers exactly the bytes the sink received, in order.
pub struct ChecksumStream<R> {
    source: R,
    buffer_size: usize,
}

impl<R: AsyncRead + Unpin + Send> ChecksumStream<R> {
    pub fn new(source: R) -> Self {
        Self::with_buffer_size(source, DEFAULT_STREAM_BUFFER_SIZE)
    }

    pub fn with_buffer_size(source: R, buffer_size: usize) -> Self {
        Self {
            source,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Drain the source into `sink`.
    ///
    /// Stops at the first read or write failure. Whatever already reached
    /// the sink stays there.
    pub async fn copy_to(mut self, sink: &mut dyn StreamingUpload) -> UploadResult<Checksum> {
        let mut hasher = FileDigest::hasher();
        let mut buf = vec![0u8; self.buffer_size];
        let mut size = 0u64;

        loop {
            let n = self.source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            sink.write(Bytes::copy_from_slice(&buf[..n]))
                .await
                .map_err(sink_error)?;
            size += n as u64;
        }

        Ok(Checksum {
            digest: hasher.finalize(),
            size,
        })
    }
}

/// Every failed sink write is an I/O failure of the copy.
fn sink_error(e: StorageError) -> UploadError {
    match e {
        StorageError::Io(io) => UploadError::Io(io),
        other => UploadError::Io(std::io::Error::other(other)),
    }
}
