//! Mapping between plaintext records and sealed store rows.
//!
//! Each secret field is sealed on its own with a fresh nonce, and the field
//! name is bound into the tag as associated data, so a blob copied into a
//! different column no longer opens.

use credvault_common::{Error, Result, SensitiveString};
use credvault_crypto::{open_with_aad, seal_with_aad, DerivedKey, SealedBlob, NONCE_SIZE, TAG_SIZE};
use credvault_storage::{StoredField, StoredRecord};

use crate::record::PlaintextRecord;

const USERNAME_AAD: &[u8] = b"credvault:username";
const PASSWORD_AAD: &[u8] = b"credvault:password";
const NOTES_AAD: &[u8] = b"credvault:notes";

fn to_field(blob: &SealedBlob) -> StoredField {
    StoredField {
        content: hex::encode(&blob.content),
        nonce: hex::encode(blob.nonce),
        tag: hex::encode(blob.tag),
    }
}

/// Parse a stored field. Any malformed part is treated like tampering.
fn from_field(field: &StoredField) -> Result<SealedBlob> {
    let content = hex::decode(&field.content).map_err(|_| Error::Integrity)?;

    let mut nonce = [0u8; NONCE_SIZE];
    hex::decode_to_slice(&field.nonce, &mut nonce).map_err(|_| Error::Integrity)?;

    let mut tag = [0u8; TAG_SIZE];
    hex::decode_to_slice(&field.tag, &mut tag).map_err(|_| Error::Integrity)?;

    Ok(SealedBlob {
        content,
        nonce,
        tag,
    })
}

fn seal_field(value: &SensitiveString, aad: &[u8], key: &DerivedKey) -> Result<StoredField> {
    let blob = seal_with_aad(value.as_bytes(), aad, key)?;
    Ok(to_field(&blob))
}

fn open_field(field: &StoredField, aad: &[u8], key: &DerivedKey) -> Result<SensitiveString> {
    let blob = from_field(field)?;
    let plaintext = open_with_aad(&blob, aad, key)?;
    SensitiveString::from_utf8(plaintext.as_bytes().to_vec()).map_err(|_| Error::Integrity)
}

/// Seal the secret fields of `record` for storage.
///
/// # Postconditions
/// - `username` and `password` each carry their own nonce and tag
/// - Empty notes are not written (`notes` is `None`)
///
/// # Errors
/// - `Validation` if required fields are missing
/// - `Transient` if no nonce could be generated
pub fn encode_record(record: &PlaintextRecord, key: &DerivedKey) -> Result<StoredRecord> {
    record.validate()?;

    let notes = if record.notes.is_empty() {
        None
    } else {
        Some(seal_field(&record.notes, NOTES_AAD, key)?)
    };

    Ok(StoredRecord {
        site_name: record.site_name.clone(),
        site_url: record.site_url.clone(),
        username: seal_field(&record.username, USERNAME_AAD, key)?,
        password: seal_field(&record.password, PASSWORD_AAD, key)?,
        notes,
    })
}

/// Open every sealed field of `stored`.
///
/// The password is opened first; a failure on any present field makes the
/// whole record unreadable. Notes that were never written decode to an
/// empty value.
///
/// # Errors
/// - `Integrity` on tampering, corruption, or a wrong key
pub fn decode_record(stored: &StoredRecord, key: &DerivedKey) -> Result<PlaintextRecord> {
    let password = open_field(&stored.password, PASSWORD_AAD, key)?;
    let username = open_field(&stored.username, USERNAME_AAD, key)?;
    let notes = match &stored.notes {
        Some(field) => open_field(field, NOTES_AAD, key)?,
        None => SensitiveString::default(),
    };

    Ok(PlaintextRecord {
        site_name: stored.site_name.clone(),
        site_url: stored.site_url.clone(),
        username,
        password,
        notes,
    })
}
