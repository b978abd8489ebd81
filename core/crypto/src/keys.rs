//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::kdf::KdfParams;
use credvault_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of the per-account KDF salt in bytes.
pub const SALT_LENGTH: usize = 32;

/// Length of the verification digest in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// Current verification token layout.
pub const TOKEN_VERSION: u32 = 1;

/// Fill `buf` from the OS CSPRNG.
///
/// Entropy failure surfaces as a retryable error; there is no fallback
/// to a weaker generator.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::Transient(format!("secure random source unavailable: {}", e)))
}

/// The user's master secret, held only for the duration of one operation.
pub struct MasterSecret(Zeroizing<String>);

impl MasterSecret {
    /// Wrap a caller-supplied secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Get the secret bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for MasterSecret {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl From<&str> for MasterSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterSecret([REDACTED])")
    }
}

/// Symmetric key used to seal and open credential fields.
///
/// Only code in this crate can build one; callers receive it from
/// [`MasterKeyGuard`](crate::guard::MasterKeyGuard) after the master
/// secret has been checked against the stored token.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    pub(crate) fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(#[serde(with = "hex")] pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Result<Self> {
        let mut salt = [0u8; SALT_LENGTH];
        fill_random(&mut salt)?;
        Ok(Self(salt))
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}

/// One-way digest of a master secret, stored with the account.
///
/// Carries the salt and work factor it was produced with, so a token keeps
/// validating after the configured defaults change.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken {
    pub version: u32,
    pub salt: Salt,
    pub kdf: KdfParams,
    #[serde(with = "hex")]
    pub digest: [u8; DIGEST_LENGTH],
}

impl VerificationToken {
    /// Serialize to JSON for a text column.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl fmt::Debug for VerificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationToken")
            .field("version", &self.version)
            .field("kdf", &self.kdf)
            .field("digest", &"[REDACTED]")
            .finish()
    }
}
