//! Master secret validation.
//!
//! A guard is built for one request and consumed by the first decision it
//! makes, so a validated state cannot leak into a later request. The
//! [`DerivedKey`] it returns is the only capability that can open sealed
//! fields.
//!
//! Every rejection after input checks costs one full derivation, whether
//! the secret was wrong, the account had no token, or the token was
//! unusable.

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::kdf::{self, KdfParams};
use crate::keys::{DerivedKey, MasterSecret, Salt, VerificationToken, SALT_LENGTH, TOKEN_VERSION};
use credvault_common::{Error, Result};

/// Per-request gate between a presented master secret and the field key.
#[derive(Debug)]
pub struct MasterKeyGuard {
    min_secret_length: usize,
    fallback_params: KdfParams,
}

impl MasterKeyGuard {
    /// Create a guard enforcing a minimum secret length (in characters).
    pub fn new(min_secret_length: usize) -> Self {
        Self {
            min_secret_length: min_secret_length.max(1),
            fallback_params: KdfParams::default(),
        }
    }

    /// Set the work factor spent on a token whose own parameters are unusable.
    pub fn with_fallback_params(mut self, params: KdfParams) -> Self {
        self.fallback_params = params;
        self
    }

    fn check_input(&self, secret: &MasterSecret) -> Result<()> {
        if secret.is_empty() {
            return Err(Error::Validation("Master secret cannot be empty".to_string()));
        }
        if secret.char_len() < self.min_secret_length {
            return Err(Error::Validation(format!(
                "Master secret must be at least {} characters",
                self.min_secret_length
            )));
        }
        Ok(())
    }

    /// Run a throwaway derivation and discard the result.
    fn burn(secret: &MasterSecret, params: &KdfParams) {
        let dummy = Salt::from_bytes([0u8; SALT_LENGTH]);
        let _ = kdf::derive_key(secret, &dummy, params);
    }

    /// Produce the verification token for a new account.
    ///
    /// # Postconditions
    /// - The token carries a fresh random salt and `params`
    ///
    /// # Errors
    /// - `Validation` if the secret is too short or `params` are invalid
    /// - `Transient` if the random source fails
    pub fn enroll(self, secret: &MasterSecret, params: &KdfParams) -> Result<VerificationToken> {
        self.check_input(secret)?;
        params.validate()?;

        let salt = Salt::generate()?;
        debug!(algorithm = ?params.algorithm, memory_cost = params.memory_cost, "Enrolling master secret");
        kdf::derive_verification_token(secret, &salt, params)
    }

    /// Check `secret` against `token` and hand out the field key on success.
    ///
    /// # Errors
    /// - `Validation` if the secret is empty or too short
    /// - `Auth` if the secret does not match, or the token is unusable;
    ///   the two cases are indistinguishable to the caller
    pub fn validate(self, secret: &MasterSecret, token: &VerificationToken) -> Result<DerivedKey> {
        self.check_input(secret)?;

        let params_ok = token.kdf.validate().is_ok();
        if token.version != TOKEN_VERSION || !params_ok {
            let params = if params_ok {
                &token.kdf
            } else {
                &self.fallback_params
            };
            Self::burn(secret, params);
            return Err(Error::Auth);
        }

        let key = kdf::derive_key(secret, &token.salt, &token.kdf).map_err(|_| Error::Auth)?;
        let presented = kdf::digest_from_key(&key);

        if bool::from(presented[..].ct_eq(&token.digest[..])) {
            Ok(key)
        } else {
            Err(Error::Auth)
        }
    }

    /// Reject a request for an account that has no stored token.
    ///
    /// Runs a full derivation with `params` so the rejection costs the same
    /// as a wrong secret. Always returns an error.
    pub fn reject(self, secret: &MasterSecret, params: &KdfParams) -> Error {
        if let Err(e) = self.check_input(secret) {
            return e;
        }
        Self::burn(secret, params);
        Error::Auth
    }
}

impl Default for MasterKeyGuard {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::{open, seal};
    use crate::kdf::{test_params, KdfAlgorithm};
    use std::time::Instant;

    fn enrolled(secret: &str) -> VerificationToken {
        MasterKeyGuard::default()
            .enroll(&MasterSecret::new(secret), &test_params())
            .unwrap()
    }

    #[test]
    fn test_correct_secret_yields_key() {
        let token = enrolled("Sup3rSecret!");
        let key = MasterKeyGuard::default()
            .validate(&MasterSecret::new("Sup3rSecret!"), &token)
            .unwrap();

        let blob = seal(b"pw123", &key).unwrap();
        let opened = open(&blob, &key).unwrap();
        assert_eq!(opened.as_bytes(), b"pw123");
    }

    #[test]
    fn test_same_secret_yields_same_key() {
        let token = enrolled("Sup3rSecret!");
        let k1 = MasterKeyGuard::default()
            .validate(&MasterSecret::new("Sup3rSecret!"), &token)
            .unwrap();
        let k2 = MasterKeyGuard::default()
            .validate(&MasterSecret::new("Sup3rSecret!"), &token)
            .unwrap();

        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_wrong_secret_is_auth_error() {
        let token = enrolled("Sup3rSecret!");
        let result = MasterKeyGuard::default().validate(&MasterSecret::new("WrongSecret"), &token);

        assert!(matches!(result, Err(Error::Auth)));
    }

    #[test]
    fn test_empty_secret_is_validation_error() {
        let token = enrolled("Sup3rSecret!");
        let result = MasterKeyGuard::default().validate(&MasterSecret::new(""), &token);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_short_secret_rejected_at_enrollment() {
        let result = MasterKeyGuard::new(12).enroll(&MasterSecret::new("short"), &test_params());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_enrollment_salts_differ() {
        let t1 = enrolled("Sup3rSecret!");
        let t2 = enrolled("Sup3rSecret!");

        assert_ne!(t1.salt, t2.salt);
        assert_ne!(t1.digest, t2.digest);
    }

    #[test]
    fn test_tampered_token_is_auth_error() {
        let mut token = enrolled("Sup3rSecret!");
        token.digest[0] ^= 0x01;
        let result = MasterKeyGuard::default().validate(&MasterSecret::new("Sup3rSecret!"), &token);
        assert!(matches!(result, Err(Error::Auth)));

        let mut token = enrolled("Sup3rSecret!");
        token.kdf.time_cost = 0;
        let result = MasterKeyGuard::default()
            .with_fallback_params(test_params())
            .validate(&MasterSecret::new("Sup3rSecret!"), &token);
        assert!(matches!(result, Err(Error::Auth)));

        let mut token = enrolled("Sup3rSecret!");
        token.version = 99;
        let result = MasterKeyGuard::default().validate(&MasterSecret::new("Sup3rSecret!"), &token);
        assert!(matches!(result, Err(Error::Auth)));
    }

    #[test]
    fn test_unusable_token_costs_a_derivation() {
        let params = KdfParams::new(KdfAlgorithm::Argon2id, 4096, 1, 1).unwrap();
        let secret = MasterSecret::new("Sup3rSecret!");
        let token = MasterKeyGuard::default().enroll(&secret, &params).unwrap();
        let wrong = MasterSecret::new("WrongSecret");

        let started = Instant::now();
        let result = MasterKeyGuard::default().validate(&wrong, &token);
        let wrong_secret = started.elapsed();
        assert!(matches!(result, Err(Error::Auth)));

        let mut future_version = token.clone();
        future_version.version = TOKEN_VERSION + 1;
        let started = Instant::now();
        let result = MasterKeyGuard::default().validate(&secret, &future_version);
        let bad_version = started.elapsed();
        assert!(matches!(result, Err(Error::Auth)));

        let mut bad_params = token;
        bad_params.kdf.parallelism = 0;
        let started = Instant::now();
        let result = MasterKeyGuard::default()
            .with_fallback_params(params)
            .validate(&secret, &bad_params);
        let unusable_params = started.elapsed();
        assert!(matches!(result, Err(Error::Auth)));

        assert!(bad_version * 4 >= wrong_secret, "{:?} vs {:?}", bad_version, wrong_secret);
        assert!(unusable_params * 4 >= wrong_secret, "{:?} vs {:?}", unusable_params, wrong_secret);
    }

    #[test]
    fn test_reject_is_generic() {
        let err = MasterKeyGuard::default().reject(&MasterSecret::new("Sup3rSecret!"), &test_params());
        assert!(matches!(err, Error::Auth));

        let err = MasterKeyGuard::default().reject(&MasterSecret::new(""), &test_params());
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_key_from_other_account_cannot_open() {
        let token_a = enrolled("Sup3rSecret!");
        let token_b = enrolled("Sup3rSecret!");
        let key_a = MasterKeyGuard::default()
            .validate(&MasterSecret::new("Sup3rSecret!"), &token_a)
            .unwrap();
        let key_b = MasterKeyGuard::default()
            .validate(&MasterSecret::new("Sup3rSecret!"), &token_b)
            .unwrap();

        let blob = seal(b"pw123", &key_a).unwrap();
        assert!(matches!(open(&blob, &key_b), Err(Error::Integrity)));
    }
}
