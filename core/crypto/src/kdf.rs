//! Key derivation using Argon2.
//!
//! The master secret is stretched once with Argon2 into a root value, and
//! the field key is expanded from the root with BLAKE2b under its own
//! context label. The digest stored in the verification token is a second
//! BLAKE2b expansion of the field key under a different label, so the
//! token does not reveal the key.

use argon2::{Algorithm, Argon2, Params, Version};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::keys::{
    DerivedKey, MasterSecret, Salt, VerificationToken, DIGEST_LENGTH, KEY_LENGTH, TOKEN_VERSION,
};
use credvault_common::{Error, Result};

const FIELD_KEY_CONTEXT: &[u8] = b"credvault/field-key/v1";
const VERIFICATION_CONTEXT: &[u8] = b"credvault/verification/v1";

/// Argon2 variant used to stretch the master secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    #[default]
    Argon2id,
    Argon2i,
}

impl KdfAlgorithm {
    fn to_argon2(self) -> Algorithm {
        match self {
            KdfAlgorithm::Argon2id => Algorithm::Argon2id,
            KdfAlgorithm::Argon2i => Algorithm::Argon2i,
        }
    }
}

/// Parameters for master-secret stretching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Argon2 variant.
    #[serde(default)]
    pub algorithm: KdfAlgorithm,
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters, checking them against Argon2's bounds.
    ///
    /// # Errors
    /// - Returns error if the memory, time, or lane counts are out of range
    pub fn new(
        algorithm: KdfAlgorithm,
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self> {
        let params = Self {
            algorithm,
            memory_cost,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create parameters suitable for interactive use.
    ///
    /// These parameters provide a balance between security and usability,
    /// targeting approximately 0.5-1 second of derivation time.
    pub fn interactive() -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Create parameters suitable for sensitive data.
    ///
    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Create moderate parameters for constrained hosts.
    pub fn moderate() -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Check the parameters against Argon2's bounds.
    pub fn validate(&self) -> Result<()> {
        self.argon2_params().map(|_| ())
    }

    fn argon2_params(&self) -> Result<Params> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| Error::Validation(format!("Invalid KDF parameters: {}", e)))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Stretch the master secret into the root value both outputs expand from.
///
/// The secret is not checked here; length policy belongs to the guard.
fn stretch(
    secret: &MasterSecret,
    salt: &Salt,
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LENGTH]>> {
    let argon2 = Argon2::new(
        params.algorithm.to_argon2(),
        Version::V0x13,
        params.argon2_params()?,
    );

    let mut root = Zeroizing::new([0u8; KEY_LENGTH]);
    argon2
        .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut root[..])
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(root)
}

fn expand(input: &[u8; KEY_LENGTH], context: &[u8]) -> Zeroizing<[u8; KEY_LENGTH]> {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(input);
    hasher.update(context);

    let mut out = Zeroizing::new([0u8; KEY_LENGTH]);
    out.copy_from_slice(&hasher.finalize());
    out
}

/// One-way digest of a field key, as stored in the verification token.
pub(crate) fn digest_from_key(key: &DerivedKey) -> [u8; DIGEST_LENGTH] {
    *expand(key.as_bytes(), VERIFICATION_CONTEXT)
}

/// Derive the field encryption key.
///
/// Deterministic in (`secret`, `salt`, `params`). Crate-private: outside
/// this crate a key is only handed out by the guard.
///
/// # Errors
/// - `Validation` if `params` are outside Argon2's bounds
pub(crate) fn derive_key(
    secret: &MasterSecret,
    salt: &Salt,
    params: &KdfParams,
) -> Result<DerivedKey> {
    let root = stretch(secret, salt, params)?;
    Ok(DerivedKey::from_bytes(*expand(&root, FIELD_KEY_CONTEXT)))
}

/// Derive the verification token stored alongside the account.
///
/// Equal inputs always yield equal tokens. The digest is a one-way
/// function of the field key under its own context label.
pub fn derive_verification_token(
    secret: &MasterSecret,
    salt: &Salt,
    params: &KdfParams,
) -> Result<VerificationToken> {
    let key = derive_key(secret, salt, params)?;
    Ok(VerificationToken {
        version: TOKEN_VERSION,
        salt: salt.clone(),
        kdf: params.clone(),
        digest: digest_from_key(&key),
    })
}

#[cfg(test)]
pub(crate) fn test_params() -> KdfParams {
    KdfParams::new(KdfAlgorithm::Argon2id, 256, 1, 1).unwrap()
}
