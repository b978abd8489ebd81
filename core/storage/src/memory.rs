//! In-memory record and account store for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::provider::{AccountStore, RecordEntry, RecordStore, StoredRecord};
use credvault_common::{Error, OwnerId, RecordId, Result};
use credvault_crypto::VerificationToken;

/// Record slot with its insertion sequence, used for stable ordering.
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    entry: RecordEntry,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    records: HashMap<String, Slot>,
    accounts: HashMap<String, VerificationToken>,
}

/// In-memory store implementing both [`RecordStore`] and [`AccountStore`].
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("memory store lock poisoned".to_string())
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all owners.
    pub fn record_count(&self) -> Result<usize> {
        Ok(self.state.read().map_err(poisoned)?.records.len())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_records(&self, owner: &OwnerId) -> Result<Vec<RecordEntry>> {
        let state = self.state.read().map_err(poisoned)?;

        let mut slots: Vec<&Slot> = state
            .records
            .values()
            .filter(|slot| &slot.entry.owner == owner)
            .collect();
        slots.sort_by_key(|slot| slot.seq);

        Ok(slots.into_iter().map(|slot| slot.entry.clone()).collect())
    }

    async fn get_record(&self, id: &RecordId) -> Result<RecordEntry> {
        let state = self.state.read().map_err(poisoned)?;
        state
            .records
            .get(id.as_str())
            .map(|slot| slot.entry.clone())
            .ok_or_else(|| Error::NotFound(format!("Record not found: {}", id)))
    }

    async fn insert_record(&self, owner: &OwnerId, record: StoredRecord) -> Result<RecordId> {
        let id = RecordId::new(Uuid::new_v4().to_string())?;
        let now = Utc::now();

        let mut state = self.state.write().map_err(poisoned)?;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.records.insert(
            id.as_str().to_string(),
            Slot {
                seq,
                entry: RecordEntry {
                    id: id.clone(),
                    owner: owner.clone(),
                    record,
                    created_at: now,
                    updated_at: now,
                },
            },
        );

        debug!(owner = %owner, record = %id, "Record inserted");
        Ok(id)
    }

    async fn replace_record(&self, id: &RecordId, record: StoredRecord) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        match state.records.get_mut(id.as_str()) {
            Some(slot) => {
                slot.entry.record = record;
                slot.entry.updated_at = Utc::now();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Record not found: {}", id))),
        }
    }

    async fn delete_record(&self, id: &RecordId) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        match state.records.remove(id.as_str()) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("Record not found: {}", id))),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_verification_token(&self, owner: &OwnerId) -> Result<Option<VerificationToken>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.accounts.get(owner.as_str()).cloned())
    }

    async fn set_verification_token(
        &self,
        owner: &OwnerId,
        token: VerificationToken,
    ) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.accounts.contains_key(owner.as_str()) {
            return Err(Error::AlreadyExists(format!("Account already registered: {}", owner)));
        }
        state.accounts.insert(owner.as_str().to_string(), token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StoredField;
    use credvault_crypto::{KdfParams, Salt};

    fn field(tag: &str) -> StoredField {
        StoredField {
            content: "c0ffee".to_string(),
            nonce: "00".repeat(12),
            tag: tag.to_string(),
        }
    }

    fn record(site: &str) -> StoredRecord {
        StoredRecord {
            site_name: site.to_string(),
            site_url: None,
            username: field("11"),
            password: field("22"),
            notes: None,
        }
    }

    fn token() -> VerificationToken {
        VerificationToken {
            version: 1,
            salt: Salt::from_bytes([1u8; 32]),
            kdf: KdfParams::moderate(),
            digest: [2u8; 32],
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_in_order() {
        let store = MemoryStore::new();
        let alice = OwnerId::new("alice").unwrap();
        let bob = OwnerId::new("bob").unwrap();

        store.insert_record(&alice, record("one")).await.unwrap();
        store.insert_record(&bob, record("other")).await.unwrap();
        store.insert_record(&alice, record("two")).await.unwrap();

        let found = store.find_records(&alice).await.unwrap();
        let names: Vec<_> = found.iter().map(|e| e.record.site_name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(store.record_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replace_keeps_owner_and_created_at() {
        let store = MemoryStore::new();
        let alice = OwnerId::new("alice").unwrap();
        let id = store.insert_record(&alice, record("one")).await.unwrap();
        let before = store.get_record(&id).await.unwrap();

        store.replace_record(&id, record("renamed")).await.unwrap();
        let after = store.get_record(&id).await.unwrap();

        assert_eq!(after.record.site_name, "renamed");
        assert_eq!(after.owner, alice);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_missing_record_errors() {
        let store = MemoryStore::new();
        let id = RecordId::new("missing").unwrap();

        assert!(matches!(store.get_record(&id).await, Err(Error::NotFound(_))));
        assert!(matches!(
            store.replace_record(&id, record("x")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(store.delete_record(&id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_record() {
        let store = MemoryStore::new();
        let alice = OwnerId::new("alice").unwrap();
        let id = store.insert_record(&alice, record("one")).await.unwrap();

        store.delete_record(&id).await.unwrap();
        assert!(store.find_records(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_token_written_once() {
        let store = MemoryStore::new();
        let alice = OwnerId::new("alice").unwrap();

        assert!(store.get_verification_token(&alice).await.unwrap().is_none());
        store.set_verification_token(&alice, token()).await.unwrap();
        assert_eq!(store.get_verification_token(&alice).await.unwrap(), Some(token()));

        let again = store.set_verification_token(&alice, token()).await;
        assert!(matches!(again, Err(Error::AlreadyExists(_))));
    }
}
