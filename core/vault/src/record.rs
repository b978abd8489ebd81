//! Plaintext credential records.

use chrono::{DateTime, Utc};

use credvault_common::{Error, RecordId, Result, SensitiveString};

/// A credential as the caller sees it.
///
/// `site_name` and `site_url` are stored in the clear; the remaining fields
/// are sealed before they reach a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaintextRecord {
    pub site_name: String,
    pub site_url: Option<String>,
    pub username: SensitiveString,
    pub password: SensitiveString,
    pub notes: SensitiveString,
}

impl PlaintextRecord {
    /// Build a record with the required fields; `site_url` and `notes`
    /// start empty.
    pub fn new(
        site_name: impl Into<String>,
        username: impl Into<SensitiveString>,
        password: impl Into<SensitiveString>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            site_url: None,
            username: username.into(),
            password: password.into(),
            notes: SensitiveString::default(),
        }
    }

    /// Set the site URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    /// Set the notes.
    pub fn with_notes(mut self, notes: impl Into<SensitiveString>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Check required fields.
    ///
    /// # Errors
    /// - Empty site name
    /// - Empty password
    pub fn validate(&self) -> Result<()> {
        if self.site_name.trim().is_empty() {
            return Err(Error::Validation("site_name is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("password is required".to_string()));
        }
        Ok(())
    }
}

/// A decrypted record returned to the caller.
#[derive(Debug, Clone)]
pub struct VaultEntry {
    pub id: RecordId,
    pub record: PlaintextRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
