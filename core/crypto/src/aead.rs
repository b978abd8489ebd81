//! Authenticated encryption of single fields using ChaCha20-Poly1305.
//!
//! Every seal draws a fresh 12-byte nonce from the OS CSPRNG, so two
//! fields sealed under the same key never share nonce material. The tag is
//! kept detached so the three parts can be stored in separate columns.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Nonce, Tag,
};
use zeroize::Zeroize;

use crate::keys::{fill_random, DerivedKey};
use credvault_common::{Error, Result, SensitiveBytes};

/// Nonce size for ChaCha20-Poly1305 (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Ciphertext of one field together with the nonce and tag needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlob {
    pub content: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
}

/// Seal `plaintext` under `key` with no associated data.
pub fn seal(plaintext: &[u8], key: &DerivedKey) -> Result<SealedBlob> {
    seal_with_aad(plaintext, b"", key)
}

/// Open a blob produced by [`seal`].
pub fn open(blob: &SealedBlob, key: &DerivedKey) -> Result<SensitiveBytes> {
    open_with_aad(blob, b"", key)
}

/// Seal `plaintext`, binding `aad` into the tag.
///
/// # Postconditions
/// - `content` has exactly the plaintext length
/// - The nonce is freshly generated for this call
///
/// # Errors
/// - `Transient` if the random source cannot supply a nonce
pub fn seal_with_aad(plaintext: &[u8], aad: &[u8], key: &DerivedKey) -> Result<SealedBlob> {
    let mut nonce = [0u8; NONCE_SIZE];
    fill_random(&mut nonce)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut content = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(Nonce::from_slice(&nonce), aad, &mut content)
    {
        Ok(tag) => tag,
        Err(e) => {
            content.zeroize();
            return Err(Error::Crypto(format!("Encryption failed: {}", e)));
        }
    };

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);

    Ok(SealedBlob {
        content,
        nonce,
        tag: tag_bytes,
    })
}

/// Open a blob, verifying the tag over `aad` and the ciphertext.
///
/// # Errors
/// - `Integrity` on any mismatch of key, nonce, content, tag, or `aad`;
///   no plaintext is released in that case
pub fn open_with_aad(blob: &SealedBlob, aad: &[u8], key: &DerivedKey) -> Result<SensitiveBytes> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut buffer = blob.content.clone();
    match cipher.decrypt_in_place_detached(
        Nonce::from_slice(&blob.nonce),
        aad,
        &mut buffer,
        Tag::from_slice(&blob.tag),
    ) {
        Ok(()) => Ok(SensitiveBytes::new(buffer)),
        Err(_) => {
            buffer.zeroize();
            Err(Error::Integrity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LENGTH;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn key(byte: u8) -> DerivedKey {
        DerivedKey::from_bytes([byte; KEY_LENGTH])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = key(42);
        let blob = seal(b"Hello, World!", &key).unwrap();
        let opened = open(&blob, &key).unwrap();

        assert_eq!(opened.as_bytes(), b"Hello, World!");
    }

    #[test]
    fn test_content_length_matches_plaintext() {
        let key = key(42);
        let blob = seal(b"Test message", &key).unwrap();

        assert_eq!(blob.content.len(), b"Test message".len());
        assert_ne!(blob.content, b"Test message");
    }

    #[test]
    fn test_empty_plaintext() {
        let key = key(42);
        let blob = seal(b"", &key).unwrap();

        assert!(blob.content.is_empty());
        assert!(open(&blob, &key).unwrap().is_empty());
    }

    #[test]
    fn test_different_nonce_each_time() {
        let key = key(42);
        let b1 = seal(b"Same plaintext", &key).unwrap();
        let b2 = seal(b"Same plaintext", &key).unwrap();

        assert_ne!(b1.nonce, b2.nonce);
        assert_ne!(b1.content, b2.content);
    }

    #[test]
    fn test_nonces_unique_over_large_sample() {
        let key = key(1);
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let blob = seal(b"x", &key).unwrap();
            assert!(seen.insert(blob.nonce), "nonce repeated");
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = seal(b"Secret data", &key(1)).unwrap();
        assert!(matches!(open(&blob, &key(2)), Err(Error::Integrity)));
    }

    #[test]
    fn test_swapped_nonce_fails() {
        let key = key(42);
        let mut blob = seal(b"Important data", &key).unwrap();
        let other = seal(b"Important data", &key).unwrap();
        blob.nonce = other.nonce;

        assert!(matches!(open(&blob, &key), Err(Error::Integrity)));
    }

    #[test]
    fn test_truncated_content_fails() {
        let key = key(42);
        let mut blob = seal(b"Important data", &key).unwrap();
        blob.content.pop();

        assert!(matches!(open(&blob, &key), Err(Error::Integrity)));
    }

    #[test]
    fn test_aad_mismatch_fails() {
        let key = key(42);
        let blob = seal_with_aad(b"pw123", b"credvault:password", &key).unwrap();

        assert!(open_with_aad(&blob, b"credvault:password", &key).is_ok());
        assert!(matches!(
            open_with_aad(&blob, b"credvault:username", &key),
            Err(Error::Integrity)
        ));
        assert!(open(&blob, &key).is_err());
    }

    #[test]
    fn test_large_plaintext() {
        let key = key(42);
        let plaintext = vec![0xABu8; 1_000_000];

        let blob = seal(&plaintext, &key).unwrap();
        let opened = open(&blob, &key).unwrap();
        assert_eq!(opened.as_bytes(), plaintext.as_slice());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..512), k in any::<u8>()) {
            let key = key(k);
            let blob = seal(&plaintext, &key).unwrap();
            let opened = open(&blob, &key).unwrap();
            prop_assert_eq!(opened.as_bytes(), plaintext.as_slice());
        }

        #[test]
        fn prop_content_bit_flip_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = key(7);
            let mut blob = seal(&plaintext, &key).unwrap();
            let i = index.index(blob.content.len());
            blob.content[i] ^= 1 << bit;
            prop_assert!(matches!(open(&blob, &key), Err(Error::Integrity)));
        }

        #[test]
        fn prop_tag_bit_flip_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            index in 0usize..TAG_SIZE,
            bit in 0u8..8,
        ) {
            let key = key(7);
            let mut blob = seal(&plaintext, &key).unwrap();
            blob.tag[index] ^= 1 << bit;
            prop_assert!(matches!(open(&blob, &key), Err(Error::Integrity)));
        }

        #[test]
        fn prop_wrong_key_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            k1 in any::<u8>(),
            k2 in any::<u8>(),
        ) {
            prop_assume!(k1 != k2);
            let blob = seal(&plaintext, &key(k1)).unwrap();
            prop_assert!(matches!(open(&blob, &key(k2)), Err(Error::Integrity)));
        }
    }
}
