//! Request-facing vault operations.
//!
//! Every call that reads or writes ciphertext runs the master secret
//! through a fresh [`MasterKeyGuard`] first. Derivation runs on the blocking
//! pool under the configured timeout, and the resulting key is dropped
//! before the call returns. Store I/O happens before the key is derived or
//! after it is dropped, never while plaintext is being produced.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec::{decode_record, encode_record};
use crate::config::VaultConfig;
use crate::record::{PlaintextRecord, VaultEntry};
use credvault_common::{Error, OwnerId, RecordId, Result};
use credvault_crypto::{DerivedKey, MasterKeyGuard, MasterSecret};
use credvault_storage::{AccountStore, RecordEntry, RecordStore};

/// Credential vault service over a record store and an account store.
pub struct VaultService {
    config: VaultConfig,
    records: Arc<dyn RecordStore>,
    accounts: Arc<dyn AccountStore>,
}

impl VaultService {
    /// Create a service over separate record and account stores.
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(
        config: VaultConfig,
        records: Arc<dyn RecordStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            records,
            accounts,
        })
    }

    /// Create a service over one backend that stores both records and tokens.
    pub fn with_store<S>(config: VaultConfig, store: Arc<S>) -> Result<Self>
    where
        S: RecordStore + AccountStore + 'static,
    {
        Self::new(config, store.clone(), store)
    }

    /// Get the service configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Run one guard decision on the blocking pool, bounded by the timeout.
    ///
    /// A result arriving after the timeout is dropped with the task.
    async fn run_guarded<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(MasterKeyGuard) -> Result<T> + Send + 'static,
    {
        let guard = MasterKeyGuard::new(self.config.min_secret_length)
            .with_fallback_params(self.config.kdf_params.clone());
        let task = tokio::task::spawn_blocking(move || f(guard));

        match tokio::time::timeout(self.config.derivation_timeout(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::Transient(format!(
                "key derivation task failed: {}",
                e
            ))),
            Err(_) => {
                warn!(
                    timeout_ms = self.config.derivation_timeout_ms,
                    "Key derivation timed out"
                );
                Err(Error::Transient("key derivation timed out".to_string()))
            }
        }
    }

    /// Validate `secret` for `owner` and derive the field key.
    ///
    /// A token that no longer parses is handled like a missing one.
    async fn unlock(&self, owner: &OwnerId, secret: MasterSecret) -> Result<DerivedKey> {
        let token = match self.accounts.get_verification_token(owner).await {
            Ok(token) => token,
            Err(Error::Serialization(_)) => {
                warn!(owner = %owner, "Stored verification token is unreadable");
                None
            }
            Err(e) => return Err(e),
        };
        let fallback = self.config.kdf_params.clone();

        let result = self
            .run_guarded(move |guard| match token {
                Some(token) => guard.validate(&secret, &token),
                None => Err(guard.reject(&secret, &fallback)),
            })
            .await;

        if matches!(result, Err(Error::Auth)) {
            warn!(owner = %owner, "Master secret rejected");
        }
        result
    }

    /// Fetch a record, hiding records that belong to someone else.
    async fn owned_record(&self, id: &RecordId, owner: &OwnerId) -> Result<RecordEntry> {
        let entry = self.records.get_record(id).await?;
        if &entry.owner != owner {
            return Err(Error::NotFound(format!("Record not found: {}", id)));
        }
        Ok(entry)
    }

    /// Register a new account and store its verification token.
    ///
    /// # Errors
    /// - `AlreadyExists` if the owner is already registered
    /// - `Validation` if the secret is too short
    /// - `Transient` on derivation timeout or entropy failure
    pub async fn register(&self, owner: &OwnerId, secret: MasterSecret) -> Result<()> {
        if self.accounts.get_verification_token(owner).await?.is_some() {
            return Err(Error::AlreadyExists(format!(
                "Account already registered: {}",
                owner
            )));
        }

        let params = self.config.kdf_params.clone();
        let token = self
            .run_guarded(move |guard| guard.enroll(&secret, &params))
            .await?;

        self.accounts.set_verification_token(owner, token).await?;
        info!(owner = %owner, "Account registered");
        Ok(())
    }

    /// Seal `record` and store it for `owner`.
    ///
    /// # Errors
    /// - `Validation` for missing fields, checked before any derivation
    /// - `Auth` if the secret does not match
    pub async fn create_secret(
        &self,
        owner: &OwnerId,
        record: PlaintextRecord,
        secret: MasterSecret,
    ) -> Result<RecordId> {
        record.validate()?;

        let stored = {
            let key = self.unlock(owner, secret).await?;
            encode_record(&record, &key)?
        };

        let id = self.records.insert_record(owner, stored).await?;
        info!(owner = %owner, record = %id, "Secret created");
        Ok(id)
    }

    /// Decrypt every record of `owner`.
    ///
    /// Records failing integrity are skipped and logged. If the owner has
    /// records and none of them open, the whole call fails with `Integrity`.
    ///
    /// # Errors
    /// - `Auth` if the secret does not match, before any decryption
    pub async fn list_secrets(
        &self,
        owner: &OwnerId,
        secret: MasterSecret,
    ) -> Result<Vec<VaultEntry>> {
        let entries = self.records.find_records(owner).await?;
        let key = self.unlock(owner, secret).await?;

        let total = entries.len();
        let mut opened = Vec::with_capacity(total);
        for entry in entries {
            match decode_record(&entry.record, &key) {
                Ok(record) => opened.push(VaultEntry {
                    id: entry.id,
                    record,
                    created_at: entry.created_at,
                    updated_at: entry.updated_at,
                }),
                Err(Error::Integrity) => {
                    warn!(owner = %owner, record = %entry.id, "Skipping record that failed integrity check");
                }
                Err(e) => return Err(e),
            }
        }
        drop(key);

        if total > 0 && opened.is_empty() {
            return Err(Error::Integrity);
        }

        debug!(owner = %owner, returned = opened.len(), skipped = total - opened.len(), "Secrets listed");
        Ok(opened)
    }

    /// Decrypt one record.
    ///
    /// # Errors
    /// - `NotFound` if the record does not exist or is not owned by `owner`
    /// - `Auth` if the secret does not match
    /// - `Integrity` if the record fails to open
    pub async fn get_secret(
        &self,
        id: &RecordId,
        owner: &OwnerId,
        secret: MasterSecret,
    ) -> Result<VaultEntry> {
        let entry = self.owned_record(id, owner).await?;
        let key = self.unlock(owner, secret).await?;

        let record = decode_record(&entry.record, &key)?;
        Ok(VaultEntry {
            id: entry.id,
            record,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        })
    }

    /// Re-seal every field of an existing record and replace it.
    ///
    /// # Errors
    /// - `Validation` for missing fields
    /// - `NotFound` if the record does not exist or is not owned by `owner`
    /// - `Auth` if the secret does not match
    pub async fn update_secret(
        &self,
        id: &RecordId,
        owner: &OwnerId,
        record: PlaintextRecord,
        secret: MasterSecret,
    ) -> Result<()> {
        record.validate()?;
        self.owned_record(id, owner).await?;

        let stored = {
            let key = self.unlock(owner, secret).await?;
            encode_record(&record, &key)?
        };

        self.records.replace_record(id, stored).await?;
        info!(owner = %owner, record = %id, "Secret updated");
        Ok(())
    }

    /// Delete a record. Requires no key material, only ownership.
    ///
    /// # Errors
    /// - `NotFound` if the record does not exist or is not owned by `owner`
    pub async fn delete_secret(&self, id: &RecordId, owner: &OwnerId) -> Result<()> {
        self.owned_record(id, owner).await?;
        self.records.delete_record(id).await?;
        info!(owner = %owner, record = %id, "Secret deleted");
        Ok(())
    }
}
