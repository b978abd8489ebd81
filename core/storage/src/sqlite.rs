//! SQLite-backed record and account store.
//!
//! Sealed parts are kept in text columns as hex, one column per part per
//! field, so rows stay inspectable with ordinary SQL tooling. Every query
//! runs on the blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::provider::{AccountStore, RecordEntry, RecordStore, StoredField, StoredRecord};
use credvault_common::{Error, OwnerId, RecordId, Result};
use credvault_crypto::VerificationToken;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    owner_id TEXT PRIMARY KEY,
    verification_token TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    owner_id TEXT NOT NULL,
    site_name TEXT NOT NULL,
    site_url TEXT,
    username_content TEXT NOT NULL,
    username_nonce TEXT NOT NULL,
    username_tag TEXT NOT NULL,
    password_content TEXT NOT NULL,
    password_nonce TEXT NOT NULL,
    password_tag TEXT NOT NULL,
    notes_content TEXT,
    notes_nonce TEXT,
    notes_tag TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_credentials_owner ON credentials(owner_id);
"#;

const SELECT_COLUMNS: &str = "id, owner_id, site_name, site_url, \
    username_content, username_nonce, username_tag, \
    password_content, password_nonce, password_tag, \
    notes_content, notes_nonce, notes_tag, created_at, updated_at";

/// Raw column values of one credentials row.
struct CredentialRow {
    id: String,
    owner_id: String,
    site_name: String,
    site_url: Option<String>,
    username: StoredField,
    password: StoredField,
    notes: (Option<String>, Option<String>, Option<String>),
    created_at: i64,
    updated_at: i64,
}

impl CredentialRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            site_name: row.get(2)?,
            site_url: row.get(3)?,
            username: StoredField {
                content: row.get(4)?,
                nonce: row.get(5)?,
                tag: row.get(6)?,
            },
            password: StoredField {
                content: row.get(7)?,
                nonce: row.get(8)?,
                tag: row.get(9)?,
            },
            notes: (row.get(10)?, row.get(11)?, row.get(12)?),
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn into_entry(self) -> Result<RecordEntry> {
        // Partly written notes are passed on with the missing parts empty;
        // they can no longer be opened and the record fails its integrity check.
        let notes = match self.notes {
            (None, None, None) => None,
            (content, nonce, tag) => {
                if content.is_none() || nonce.is_none() || tag.is_none() {
                    warn!(record = %self.id, "Incomplete notes columns");
                }
                Some(StoredField {
                    content: content.unwrap_or_default(),
                    nonce: nonce.unwrap_or_default(),
                    tag: tag.unwrap_or_default(),
                })
            }
        };

        Ok(RecordEntry {
            id: RecordId::new(self.id)?,
            owner: OwnerId::new(self.owner_id)?,
            record: StoredRecord {
                site_name: self.site_name,
                site_url: self.site_url,
                username: self.username,
                password: self.password,
                notes,
            },
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::Storage(format!("Invalid timestamp: {}", ms)))
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Notes columns of a record, all `NULL` when the notes were never written.
fn notes_columns(notes: Option<StoredField>) -> (Option<String>, Option<String>, Option<String>) {
    match notes {
        Some(f) => (Some(f.content), Some(f.nonce), Some(f.tag)),
        None => (None, None, None),
    }
}

/// SQLite store implementing both [`RecordStore`] and [`AccountStore`].
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create or open a store database.
    ///
    /// # Errors
    /// - Database creation or schema initialization failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(storage_err)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;

        info!("Credential store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::Storage("sqlite connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Storage(format!("sqlite task failed: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn find_records(&self, owner: &OwnerId) -> Result<Vec<RecordEntry>> {
        let owner_id = owner.as_str().to_string();
        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM credentials WHERE owner_id = ?1 ORDER BY seq",
                        SELECT_COLUMNS
                    ))
                    .map_err(storage_err)?;
                let rows = stmt
                    .query_map([owner_id], CredentialRow::from_row)
                    .map_err(storage_err)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(storage_err)?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(CredentialRow::into_entry).collect()
    }

    async fn get_record(&self, id: &RecordId) -> Result<RecordEntry> {
        let record_id = id.as_str().to_string();
        let row = self
            .with_conn(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM credentials WHERE id = ?1", SELECT_COLUMNS),
                    [record_id],
                    CredentialRow::from_row,
                )
                .optional()
                .map_err(storage_err)
            })
            .await?;

        match row {
            Some(row) => row.into_entry(),
            None => Err(Error::NotFound(format!("Record not found: {}", id))),
        }
    }

    async fn insert_record(&self, owner: &OwnerId, record: StoredRecord) -> Result<RecordId> {
        let id = RecordId::new(Uuid::new_v4().to_string())?;
        let record_id = id.as_str().to_string();
        let owner_id = owner.as_str().to_string();
        let now = Utc::now().timestamp_millis();

        self.with_conn(move |conn| {
            let (notes_content, notes_nonce, notes_tag) = notes_columns(record.notes);
            conn.execute(
                r#"
                INSERT INTO credentials
                (id, owner_id, site_name, site_url,
                 username_content, username_nonce, username_tag,
                 password_content, password_nonce, password_tag,
                 notes_content, notes_nonce, notes_tag, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
                "#,
                params![
                    record_id,
                    owner_id,
                    record.site_name,
                    record.site_url,
                    record.username.content,
                    record.username.nonce,
                    record.username.tag,
                    record.password.content,
                    record.password.nonce,
                    record.password.tag,
                    notes_content,
                    notes_nonce,
                    notes_tag,
                    now,
                ],
            )
            .map_err(storage_err)
        })
        .await?;

        debug!(owner = %owner, record = %id, "Record inserted");
        Ok(id)
    }

    async fn replace_record(&self, id: &RecordId, record: StoredRecord) -> Result<()> {
        let record_id = id.as_str().to_string();
        let now = Utc::now().timestamp_millis();

        let changed = self
            .with_conn(move |conn| {
                let (notes_content, notes_nonce, notes_tag) = notes_columns(record.notes);
                conn.execute(
                    r#"
                    UPDATE credentials SET
                        site_name = ?2, site_url = ?3,
                        username_content = ?4, username_nonce = ?5, username_tag = ?6,
                        password_content = ?7, password_nonce = ?8, password_tag = ?9,
                        notes_content = ?10, notes_nonce = ?11, notes_tag = ?12,
                        updated_at = ?13
                    WHERE id = ?1
                    "#,
                    params![
                        record_id,
                        record.site_name,
                        record.site_url,
                        record.username.content,
                        record.username.nonce,
                        record.username.tag,
                        record.password.content,
                        record.password.nonce,
                        record.password.tag,
                        notes_content,
                        notes_nonce,
                        notes_tag,
                        now,
                    ],
                )
                .map_err(storage_err)
            })
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Record not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_record(&self, id: &RecordId) -> Result<()> {
        let record_id = id.as_str().to_string();
        let changed = self
            .with_conn(move |conn| {
                conn.execute("DELETE FROM credentials WHERE id = ?1", params![record_id])
                    .map_err(storage_err)
            })
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Record not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn get_verification_token(&self, owner: &OwnerId) -> Result<Option<VerificationToken>> {
        let owner_id = owner.as_str().to_string();
        let json: Option<String> = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT verification_token FROM accounts WHERE owner_id = ?1",
                    [owner_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage_err)
            })
            .await?;

        json.map(|j| VerificationToken::from_json(&j)).transpose()
    }

    async fn set_verification_token(
        &self,
        owner: &OwnerId,
        token: VerificationToken,
    ) -> Result<()> {
        let json = token.to_json()?;
        let owner_id = owner.as_str().to_string();
        let now = Utc::now().timestamp_millis();

        let inserted = self
            .with_conn(move |conn| {
                match conn.execute(
                    "INSERT INTO accounts (owner_id, verification_token, created_at) VALUES (?1, ?2, ?3)",
                    params![owner_id, json, now],
                ) {
                    Ok(_) => Ok(true),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == ErrorCode::ConstraintViolation =>
                    {
                        Ok(false)
                    }
                    Err(e) => Err(storage_err(e)),
                }
            })
            .await?;

        if !inserted {
            return Err(Error::AlreadyExists(format!(
                "Account already registered: {}",
                owner
            )));
        }
        Ok(())
    }
}
