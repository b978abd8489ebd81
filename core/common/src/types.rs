//! Common types used throughout credvault.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Identifier of the account that owns a set of vault records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new OwnerId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty or only whitespace
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(crate::Error::Validation(
                "OwnerId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identifier of a single vault record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a RecordId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::Validation(
                "RecordId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

/// UTF-8 counterpart of [`SensitiveBytes`] for plaintext credential fields.
#[derive(Clone, Default, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveString(String);

impl SensitiveString {
    /// Wrap a plaintext string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build from decrypted bytes.
    ///
    /// # Errors
    /// - Returns error if the bytes are not valid UTF-8; the rejected buffer
    ///   is zeroized before returning
    pub fn from_utf8(bytes: Vec<u8>) -> crate::Result<Self> {
        match String::from_utf8(bytes) {
            Ok(s) => Ok(Self(s)),
            Err(e) => {
                let mut rejected = e.into_bytes();
                rejected.zeroize();
                Err(crate::Error::Serialization(
                    "decrypted field is not valid UTF-8".to_string(),
                ))
            }
        }
    }

    /// Borrow the plaintext.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrow the plaintext as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SensitiveString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SensitiveString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_creation() {
        let id = OwnerId::new("user-42").unwrap();
        assert_eq!(id.as_str(), "user-42");
        assert_eq!(id.to_string(), "user-42");
    }

    #[test]
    fn test_owner_id_empty_fails() {
        assert!(OwnerId::new("").is_err());
        assert!(OwnerId::new("   ").is_err());
    }

    #[test]
    fn test_record_id_empty_fails() {
        assert!(RecordId::new("").is_err());
        assert_eq!(RecordId::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_sensitive_string_debug_is_redacted() {
        let s = SensitiveString::from("pw123");
        assert_eq!(format!("{:?}", s), "SensitiveString([REDACTED])");
        assert_eq!(s.as_str(), "pw123");
    }

    #[test]
    fn test_sensitive_string_rejects_invalid_utf8() {
        assert!(SensitiveString::from_utf8(vec![0xff, 0xfe]).is_err());
        let ok = SensitiveString::from_utf8(b"a@b.com".to_vec()).unwrap();
        assert_eq!(ok.as_str(), "a@b.com");
    }

    #[test]
    fn test_sensitive_bytes_debug_shows_length_only() {
        let b = SensitiveBytes::new(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", b), "SensitiveBytes([REDACTED; 3 bytes])");
        assert_eq!(b.len(), 3);
    }
}
