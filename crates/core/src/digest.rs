//! File digest types and utilities.

use md5::{Digest, Md5};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length of a file digest in bytes.
pub const DIGEST_LEN: usize = 16;

/// A 128-bit MD5 file digest.
///
/// Used to detect corruption and transmission errors, not as a security
/// primitive. Serialized as base64, which is how records carry `md5sum`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileDigest([u8; DIGEST_LEN]);

impl FileDigest {
    /// Create a new FileDigest from raw bytes.
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Compute the digest of data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Self::hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create an incremental hasher.
    pub fn hasher() -> DigestHasher {
        DigestHasher(Md5::new())
    }

    fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        let arr: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| {
            crate::Error::InvalidDigest(format!(
                "expected {DIGEST_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Parse from base64 string.
    pub fn from_base64(s: &str) -> crate::Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| crate::Error::InvalidDigest(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Encode as base64 string.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(crate::Error::InvalidDigest(format!(
                "expected {} hex chars, got {}",
                DIGEST_LEN * 2,
                s.len()
            )));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex_str = std::str::from_utf8(chunk)
                .map_err(|e| crate::Error::InvalidDigest(e.to_string()))?;
            bytes[i] = u8::from_str_radix(hex_str, 16)
                .map_err(|e| crate::Error::InvalidDigest(e.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileDigest({})", self.to_hex())
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for FileDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for FileDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental MD5 hasher.
pub struct DigestHasher(Md5);

impl DigestHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> FileDigest {
        FileDigest(self.0.finalize().into())
    }
}

impl Default for DigestHasher {
    fn default() -> Self {
        FileDigest::hasher()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_md5() {
        let digest = FileDigest::compute(b"hello");
        assert_eq!(digest.to_hex(), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(digest.to_base64(), "XUFAKrxLKna5cZ2REBfFkg==");
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = FileDigest::hasher();
        hasher.update(b"hel");
        hasher.update(b"");
        hasher.update(b"lo");
        assert_eq!(hasher.finalize(), FileDigest::compute(b"hello"));
    }

    #[test]
    fn test_base64_rejects_wrong_length() {
        let err = FileDigest::from_base64("AQID").unwrap_err();
        assert!(err.to_string().contains("expected 16 bytes, got 3"));
    }

    #[test]
    fn test_hex_rejects_bad_input() {
        assert!(FileDigest::from_hex("abc").is_err());
        assert!(FileDigest::from_hex(&"zz".repeat(16)).is_err());
        let digest = FileDigest::compute(b"x");
        assert_eq!(FileDigest::from_hex(&digest.to_hex()).unwrap(), digest);
    }

    #[test]
    fn test_serializes_as_base64() {
        let digest = FileDigest::compute(b"hello");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, "\"XUFAKrxLKna5cZ2REBfFkg==\"");
        let back: FileDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
