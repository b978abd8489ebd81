//! Persistence interfaces consumed by the vault engine.
//!
//! The vault never performs I/O itself; it reads and writes sealed rows
//! through the traits defined here. Two backends are provided: an
//! in-memory store for tests and development, and a SQLite store that
//! keeps every sealed part as hex text.
//!
//! # Design Principles
//! - Stores only ever see ciphertext, nonces, tags, and verification tokens
//! - Async operations: callers never block a runtime thread on storage
//! - Unified error semantics: Consistent error types across backends

pub mod memory;
pub mod provider;
pub mod sqlite;

pub use memory::MemoryStore;
pub use provider::{AccountStore, RecordEntry, RecordStore, StoredField, StoredRecord};
pub use sqlite::SqliteStore;
