//! Cryptographic primitives for the credential vault.
//!
//! This module provides:
//! - Master-secret stretching with Argon2 and domain-separated derivation
//!   of the field key and the verification token
//! - Authenticated encryption of single fields using ChaCha20-Poly1305
//! - The master key guard, the only way to obtain a [`DerivedKey`]
//!   outside this crate
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Constant-time operations for sensitive comparisons

pub mod aead;
pub mod guard;
pub mod kdf;
pub mod keys;

pub use aead::{open, open_with_aad, seal, seal_with_aad, SealedBlob, NONCE_SIZE, TAG_SIZE};
pub use guard::MasterKeyGuard;
pub use kdf::{derive_verification_token, KdfAlgorithm, KdfParams};
pub use keys::{DerivedKey, MasterSecret, Salt, VerificationToken, KEY_LENGTH};
