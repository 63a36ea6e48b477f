//! Error types for the preference store.

use crate::types::Kind;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Type mismatch for key {key:?}: stored {found}, requested {expected}")]
    TypeMismatch {
        key: String,
        expected: Kind,
        found: Kind,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Subscription disconnected")]
    Disconnected,
}

impl From<rmp_serde::encode::Error> for PrefsError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        PrefsError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for PrefsError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        PrefsError::Deserialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, PrefsError>;
