//! Storage path allocation.

use crate::error::{UploadError, UploadResult};
use stash_core::UploadRequest;
use stash_core::config::DEFAULT_MAX_ALLOCATION_ATTEMPTS;
use stash_storage::ContentStore;
use std::sync::Arc;
use uuid::Uuid;

/// Longest accepted file name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Derives a fresh, unused storage path for each upload.
///
/// Paths look like `<namespace>/<aa>/<bb>/<uuid>/<name>` where `aa` and
/// `bb` are the leading hex pairs of a random v4 UUID. Two calls with the
/// same request produce different paths. Nothing is reserved: the content
/// writer's exclusive create is what settles races.
pub struct PathAllocator {
    store: Arc<dyn ContentStore>,
    max_attempts: u32,
}

impl PathAllocator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_ALLOCATION_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<dyn ContentStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Allocate a path for `request` under `namespace`.
    ///
    /// Redraws when the store already holds an object at the candidate
    /// path, up to the configured number of attempts.
    pub async fn allocate(&self, request: &UploadRequest, namespace: &str) -> UploadResult<String> {
        validate_namespace(namespace)?;
        let name = normalize_name(&request.name)?;

        for attempt in 1..=self.max_attempts {
            let path = candidate_path(namespace, &Uuid::new_v4(), name);
            let taken = self.store.exists(&path).await.map_err(|e| {
                UploadError::Allocation(format!("cannot check path {path}: {e}"))
            })?;
            if !taken {
                return Ok(path);
            }
            tracing::debug!(path = %path, attempt, "Allocated path already taken, redrawing");
        }

        Err(UploadError::Allocation(format!(
            "no free path after {} attempts",
            self.max_attempts
        )))
    }
}

fn candidate_path(namespace: &str, id: &Uuid, name: &str) -> String {
    let hex = id.simple().to_string();
    format!("{namespace}/{}/{}/{hex}/{name}", &hex[..2], &hex[2..4])
}

/// Trim `name` and reject anything that is not a single safe path component.
pub fn normalize_name(name: &str) -> UploadResult<&str> {
    let name = name.trim();
    let reject = |reason: &str| Err(UploadError::Allocation(format!("file name {reason}")));

    if name.is_empty() {
        return reject("is empty");
    }
    if name == "." || name == ".." {
        return reject("is reserved");
    }
    if name.len() > MAX_NAME_LEN {
        return reject("is too long");
    }
    if name.contains(['/', '\\']) {
        return reject("contains a path separator");
    }
    if name.chars().any(char::is_control) {
        return reject("contains a control character");
    }
    Ok(name)
}

/// Namespaces are plain directory names: ASCII alphanumerics, `-`, `_`, `.`.
pub fn validate_namespace(namespace: &str) -> UploadResult<()> {
    let valid = !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(UploadError::Allocation(format!(
            "invalid namespace {namespace:?}"
        )))
    }
}
