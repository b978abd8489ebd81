//! Record and account store trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credvault_common::{OwnerId, RecordId, Result};
use credvault_crypto::VerificationToken;

/// One sealed secret field as persisted: every part is lowercase hex text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    pub content: String,
    pub nonce: String,
    pub tag: String,
}

/// Row representation of a credential.
///
/// `site_name` and `site_url` are plaintext and queryable; the secret fields
/// are opaque to the store. `notes` is `None` when never written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub site_name: String,
    pub site_url: Option<String>,
    pub username: StoredField,
    pub password: StoredField,
    pub notes: Option<StoredField>,
}

/// A stored record together with its store-managed identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Identifier assigned by the store.
    pub id: RecordId,
    /// Owning account.
    pub owner: OwnerId,
    /// The sealed row.
    pub record: StoredRecord,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// Last full replacement time.
    pub updated_at: DateTime<Utc>,
}

/// Row-oriented store for sealed credential records.
///
/// Implementations must handle their own locking; the vault engine calls
/// them from concurrent requests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get the backend name (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// All records owned by `owner`, oldest first.
    async fn find_records(&self, owner: &OwnerId) -> Result<Vec<RecordEntry>>;

    /// Fetch a single record.
    ///
    /// # Errors
    /// - Record not found
    async fn get_record(&self, id: &RecordId) -> Result<RecordEntry>;

    /// Insert a new record and return its identifier.
    ///
    /// # Postconditions
    /// - `created_at` and `updated_at` are set to the insertion time
    async fn insert_record(&self, owner: &OwnerId, record: StoredRecord) -> Result<RecordId>;

    /// Replace every field of an existing record.
    ///
    /// # Postconditions
    /// - Owner and `created_at` are unchanged; `updated_at` is refreshed
    ///
    /// # Errors
    /// - Record not found
    async fn replace_record(&self, id: &RecordId, record: StoredRecord) -> Result<()>;

    /// Delete a record.
    ///
    /// # Errors
    /// - Record not found
    async fn delete_record(&self, id: &RecordId) -> Result<()>;
}

/// Store for per-account verification tokens.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Token for `owner`, or `None` if the account was never registered.
    async fn get_verification_token(&self, owner: &OwnerId) -> Result<Option<VerificationToken>>;

    /// Store the token for a new account.
    ///
    /// # Errors
    /// - Already exists: tokens are written once, at account creation
    async fn set_verification_token(&self, owner: &OwnerId, token: VerificationToken)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_record_serialization() {
        let field = StoredField {
            content: "00ff".to_string(),
            nonce: "aa".repeat(12),
            tag: "bb".repeat(16),
        };
        let record = StoredRecord {
            site_name: "Netflix".to_string(),
            site_url: Some("https://netflix.com".to_string()),
            username: field.clone(),
            password: field,
            notes: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: StoredRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, record);
    }
}
