//! Vault engine for credential records.
//!
//! This module provides:
//! - Plaintext credential records and their validation
//! - The record codec sealing each secret field independently
//! - Engine configuration (work factor, secret policy, timeouts)
//! - The request-facing service: register, create, list, get, update, delete
//!
//! # Architecture
//! The vault sits between the request-handling layer and the record/account
//! stores. Every operation that touches ciphertext first passes the master
//! secret through the key guard; the derived key lives only for that call.

pub mod codec;
pub mod config;
pub mod record;
pub mod service;

pub use codec::{decode_record, encode_record};
pub use config::VaultConfig;
pub use record::{PlaintextRecord, VaultEntry};
pub use service::VaultService;
