//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of paths tried before allocation gives up.
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 4;

/// Default buffer size for streamed copies (64 KiB).
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StashConfig {
    /// Content store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Document store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Upload pipeline configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl StashConfig {
    /// Validate every section.
    pub fn validate(&self) -> crate::Result<()> {
        self.storage.validate().map_err(crate::Error::Config)?;
        self.metadata.validate().map_err(crate::Error::Config)?;
        self.upload.validate().map_err(crate::Error::Config)?;
        Ok(())
    }

    /// Create a test configuration rooted in `dir`.
    ///
    /// **For testing only.**
    pub fn for_testing(dir: &std::path::Path) -> Self {
        Self {
            storage: StorageConfig::Filesystem {
                path: dir.join("storage"),
            },
            metadata: MetadataConfig::Sqlite {
                path: dir.join("metadata.db"),
                busy_timeout_secs: default_busy_timeout_secs(),
            },
            upload: UploadConfig::default(),
        }
    }
}

/// Content store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } if path.as_os_str().is_empty() => {
                Err("filesystem storage requires a non-empty path".to_string())
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Document store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// How long a writer waits on a locked database, in seconds.
        #[serde(default = "default_busy_timeout_secs")]
        busy_timeout_secs: u64,
    },
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path, .. } if path.as_os_str().is_empty() => {
                Err("sqlite metadata requires a non-empty path".to_string())
            }
            MetadataConfig::Sqlite { .. } => Ok(()),
        }
    }
}

/// Upload pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Content-store namespace new paths are allocated under.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Paths tried before allocation reports a failure.
    #[serde(default = "default_max_allocation_attempts")]
    pub max_allocation_attempts: u32,
    /// Buffer size used when streaming the upload body.
    #[serde(default = "default_stream_buffer_size")]
    pub stream_buffer_size: usize,
}

fn default_namespace() -> String {
    "files".to_string()
}

fn default_max_allocation_attempts() -> u32 {
    DEFAULT_MAX_ALLOCATION_ATTEMPTS
}

fn default_stream_buffer_size() -> usize {
    DEFAULT_STREAM_BUFFER_SIZE
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_allocation_attempts: default_max_allocation_attempts(),
            stream_buffer_size: default_stream_buffer_size(),
        }
    }
}

impl UploadConfig {
    /// Validate upload configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_allocation_attempts == 0 {
            return Err("upload.max_allocation_attempts must be at least 1".to_string());
        }
        if self.stream_buffer_size == 0 {
            return Err("upload.stream_buffer_size must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StashConfig::default();
        assert_eq!(config.upload.namespace, "files");
        assert_eq!(config.upload.max_allocation_attempts, 4);
        assert_eq!(config.upload.stream_buffer_size, 64 * 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StashConfig = serde_json::from_str(
            r#"{
                "storage": { "type": "filesystem", "path": "/srv/stash" },
                "upload": { "namespace": "alice" }
            }"#,
        )
        .unwrap();

        match &config.storage {
            StorageConfig::Filesystem { path } => assert_eq!(path, &PathBuf::from("/srv/stash")),
        }
        assert_eq!(config.upload.namespace, "alice");
        assert_eq!(config.upload.max_allocation_attempts, 4);
        match &config.metadata {
            MetadataConfig::Sqlite {
                busy_timeout_secs, ..
            } => assert_eq!(*busy_timeout_secs, 5),
        }
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = StashConfig::default();
        config.upload.max_allocation_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_allocation_attempts"));
    }

    #[test]
    fn test_validate_rejects_empty_storage_path() {
        let config = StashConfig {
            storage: StorageConfig::Filesystem {
                path: PathBuf::new(),
            },
            ..StashConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
