//! Common utilities and types shared across the credvault crates.
//!
//! This module provides the error taxonomy every layer reports through,
//! the identifiers used to address accounts and records, and zeroizing
//! wrappers for plaintext secret material.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{OwnerId, RecordId, SensitiveBytes, SensitiveString};
