use std::path::PathBuf;

use thiserror::Error;

/// Key material or signing failure. Fatal to the calling request and never
/// retried, an unreadable key will not become readable on the next attempt.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("signed credential is not configured: {0}")]
    NotConfigured(String),
    #[error("cannot read signing key '{}': {source}", .path.display())]
    KeyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("signing key is malformed: {0}")]
    KeyMalformed(#[source] jsonwebtoken::errors::Error),
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token ttl must be positive")]
    InvalidTtl,
    #[error("token validity window out of range: ttl {ttl_seconds}s, clock skew {clock_skew_seconds}s")]
    WindowOutOfRange { ttl_seconds: u64, clock_skew_seconds: u64 },
}
