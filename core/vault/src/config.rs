//! Vault engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use credvault_common::{Error, Result};
use credvault_crypto::KdfParams;

/// Configuration passed explicitly into the vault service.
///
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Work factor used when enrolling new accounts.
    ///
    /// Existing accounts keep the parameters recorded in their token.
    pub kdf_params: KdfParams,
    /// Minimum master secret length in characters.
    pub min_secret_length: usize,
    /// Upper bound on one key derivation, in milliseconds.
    pub derivation_timeout_ms: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_params: KdfParams::default(),
            min_secret_length: 8,
            derivation_timeout_ms: 30_000,
        }
    }
}

impl VaultConfig {
    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// - Invalid KDF parameters
    /// - Zero minimum secret length or zero timeout
    pub fn validate(&self) -> Result<()> {
        self.kdf_params.validate()?;
        if self.min_secret_length == 0 {
            return Err(Error::Validation(
                "min_secret_length must be at least 1".to_string(),
            ));
        }
        if self.derivation_timeout_ms == 0 {
            return Err(Error::Validation(
                "derivation_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout applied to each key derivation.
    pub fn derivation_timeout(&self) -> Duration {
        Duration::from_millis(self.derivation_timeout_ms)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credvault_crypto::KdfAlgorithm;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        let config = VaultConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.derivation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VaultConfig::from_json(r#"{"min_secret_length": 12}"#).unwrap();
        assert_eq!(config.min_secret_length, 12);
        assert_eq!(config.kdf_params, KdfParams::interactive());
        assert_eq!(config.derivation_timeout_ms, 30_000);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = VaultConfig {
            kdf_params: KdfParams::new(KdfAlgorithm::Argon2i, 1024, 2, 1).unwrap(),
            min_secret_length: 10,
            derivation_timeout_ms: 5_000,
        };

        let restored = VaultConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(VaultConfig::from_json(r#"{"derivation_timeout_ms": 0}"#).is_err());
        assert!(VaultConfig::from_json(r#"{"min_secret_length": 0}"#).is_err());
        assert!(VaultConfig::from_json(
            r#"{"kdf_params": {"memory_cost": 256, "time_cost": 0, "parallelism": 1}}"#
        )
        .is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"derivation_timeout_ms": 1500}}"#).unwrap();

        let config = VaultConfig::from_file(file.path()).unwrap();
        assert_eq!(config.derivation_timeout(), Duration::from_millis(1500));
    }
}
