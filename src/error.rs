//! Error types shared across the crate.

use thiserror::Error;

/// Failures the core can surface to callers.
///
/// Malformed persisted data is never surfaced through this type; the profile
/// store recovers from it locally by substituting a default profile.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("profile validation failed: {0}")]
    Validation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
