use super::mocks::{FaultyDocumentStore, InstrumentedContentStore};
use stash_core::config::UploadConfig;
use stash_files::FileUploader;
use stash_metadata::SqliteStore;
use stash_storage::FilesystemBackend;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::io::{AsyncRead, ReadBuf};

/// An uploader wired to instrumented collaborators over real backends.
#[allow(dead_code)]
pub struct Harness {
    pub dir: TempDir,
    pub content: Arc<InstrumentedContentStore>,
    pub documents: Arc<FaultyDocumentStore>,
    pub uploader: FileUploader,
}

#[allow(dead_code)]
impl Harness {
    pub async fn new() -> Self {
        Self::with_config(UploadConfig::default()).await
    }

    pub async fn with_config(config: UploadConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("content"))
            .await
            .unwrap();
        let content = Arc::new(InstrumentedContentStore::new(Arc::new(backend)));
        let documents = Arc::new(FaultyDocumentStore::new(
            SqliteStore::in_memory().await.unwrap(),
        ));
        let uploader = FileUploader::new(content.clone(), documents.clone(), &config);

        Self {
            dir,
            content,
            documents,
            uploader,
        }
    }

    /// Number of regular files under the content root.
    pub fn object_count(&self) -> usize {
        count_files(&self.dir.path().join("content"))
    }
}

fn count_files(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}

/// Generate deterministic test data using a seeded pseudo-random generator.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }

    data
}

/// Reader that yields `data` and then fails instead of reporting EOF.
#[allow(dead_code)]
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
}

#[allow(dead_code)]
impl FailingReader {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.pos >= self.data.len() {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "client went away",
            )));
        }
        let n = buf.remaining().min(self.data.len() - self.pos);
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}
