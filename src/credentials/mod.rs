//! Signed bearer credential for the geocoding provider.
//!
//! `TokenSigner` mints EdDSA JWTs from a PKCS#8 key on disk,
//! `CredentialTokenCache` keeps one of them alive and renews it before expiry.

pub mod error;
pub mod signer;
pub mod token;
pub mod token_cache;

pub use error::CredentialError;
pub use signer::{FileKeyReader, KeyReader, TokenSigner};
pub use token::Token;
pub use token_cache::CredentialTokenCache;
