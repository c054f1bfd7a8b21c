//! Error types for the collaborators around a typing session.
//!
//! None of these ever reach the session itself: they are caught at the host
//! boundary and logged.

use thiserror::Error;

/// Errors emitted by a `ScoreStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("unknown difficulty stored in database: {0}")]
    InvalidDifficulty(String),
    #[error("invalid timestamp stored in database: {0}")]
    InvalidTimestamp(String),
}

/// Errors emitted while provisioning an anonymous identity.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("identity file could not be accessed: {0}")]
    Io(#[from] std::io::Error),
    #[error("identity file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no location available to store the identity")]
    NoLocation,
}

/// Errors emitted while saving configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}
