use thiserror::Error;

use crate::credentials::CredentialError;
use crate::resilience::error::{AggregateError, UpstreamFetchError};

/// Everything a provider service call can fail with. The HTTP layer maps each
/// variant onto a status code and an error code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Upstream(#[from] UpstreamFetchError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
