use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::service::QWeatherConfig;
use crate::credentials::error::CredentialError;
use crate::credentials::token::Token;
use crate::helpers::time::Clock;

/// Provides the PEM bytes of the signing key.
pub trait KeyReader: Send + Sync {
    fn read_key(&self) -> BoxFuture<'_, Result<Vec<u8>, CredentialError>>;
}

/// Reads the key from disk on every signing, so a rotated file is picked up
/// at the next renewal.
#[derive(Debug, Clone)]
pub struct FileKeyReader {
    path: PathBuf,
}

impl FileKeyReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyReader for FileKeyReader {
    fn read_key(&self) -> BoxFuture<'_, Result<Vec<u8>, CredentialError>> {
        async move {
            tokio::fs::read(&self.path)
                .await
                .map_err(|source| CredentialError::KeyUnreadable {
                    path: self.path.clone(),
                    source,
                })
        }
        .boxed()
    }
}

/// Payload claims. Names and types are fixed by the provider's verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mints `{"alg":"EdDSA","kid":..}` / `{"sub","iat","exp"}` tokens.
pub struct TokenSigner {
    project_id: String,
    credential_id: String,
    clock_skew_seconds: u64,
    key_reader: Arc<dyn KeyReader>,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    pub fn new(
        project_id: impl Into<String>,
        credential_id: impl Into<String>,
        clock_skew_seconds: u64,
        key_reader: Arc<dyn KeyReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            credential_id: credential_id.into(),
            clock_skew_seconds,
            key_reader,
            clock,
        }
    }

    pub fn from_config(config: &QWeatherConfig, clock: Arc<dyn Clock>) -> Result<Self, CredentialError> {
        if !config.is_configured() {
            return Err(CredentialError::NotConfigured(
                "qweather.project_id, credential_id and private_key_path are required".to_owned(),
            ));
        }
        Ok(Self::new(
            config.project_id.clone(),
            config.credential_id.clone(),
            config.clock_skew_seconds,
            Arc::new(FileKeyReader::new(config.private_key_path.clone())),
            clock,
        ))
    }

    /// Sign a token valid for `ttl_seconds` from the skew-adjusted issue time.
    pub async fn generate_token(&self, ttl_seconds: u64) -> Result<Token, CredentialError> {
        if ttl_seconds == 0 {
            return Err(CredentialError::InvalidTtl);
        }
        let (issued_at, expires_at) = self.validity_window(ttl_seconds)?;

        let pem = self.key_reader.read_key().await?;
        let key = EncodingKey::from_ed_pem(&pem).map_err(CredentialError::KeyMalformed)?;

        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = None;
        header.kid = Some(self.credential_id.clone());

        let claims = TokenClaims {
            sub: self.project_id.clone(),
            iat: issued_at,
            exp: expires_at,
        };

        let value = encode(&header, &claims, &key).map_err(CredentialError::Signing)?;
        debug!(kid = %self.credential_id, iat = issued_at, exp = expires_at, "token signed");

        Ok(Token::new(value, issued_at, expires_at))
    }

    /// `(iat, exp)` for a token signed now; fails rather than wrap.
    fn validity_window(&self, ttl_seconds: u64) -> Result<(i64, i64), CredentialError> {
        let out_of_range = || CredentialError::WindowOutOfRange {
            ttl_seconds,
            clock_skew_seconds: self.clock_skew_seconds,
        };
        let skew = i64::try_from(self.clock_skew_seconds).map_err(|_| out_of_range())?;
        let ttl = i64::try_from(ttl_seconds).map_err(|_| out_of_range())?;
        let issued_at = self.clock.now_unix().checked_sub(skew).ok_or_else(out_of_range)?;
        let expires_at = issued_at.checked_add(ttl).ok_or_else(out_of_range)?;
        Ok((issued_at, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::time::ManualClock;
    use crate::tests::common::{write_signing_key, TEST_PUBLIC_KEY_PEM};
    use base64::Engine;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};

    fn segment(token: &str, index: usize) -> serde_json::Value {
        let part = token.split('.').nth(index).unwrap();
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(part).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    #[tokio::test]
    async fn header_and_claims_match_the_provider_contract() {
        let key_file = write_signing_key();
        let clock = Arc::new(ManualClock::new(1_700_000_000_750));
        let signer = TokenSigner::new(
            "project-1",
            "cred-9",
            30,
            Arc::new(FileKeyReader::new(key_file.path())),
            clock,
        );

        let token = signer.generate_token(900).await.unwrap();
        assert_eq!(token.issued_at, 1_700_000_000 - 30);
        assert_eq!(token.expires_at, token.issued_at + 900);

        assert_eq!(segment(&token.value, 0), serde_json::json!({"alg": "EdDSA", "kid": "cred-9"}));
        assert_eq!(
            segment(&token.value, 1),
            serde_json::json!({"sub": "project-1", "iat": 1_699_999_970, "exp": 1_700_000_870})
        );
    }

    #[tokio::test]
    async fn signature_verifies_with_the_public_key() {
        let key_file = write_signing_key();
        let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp_millis()));
        let signer = TokenSigner::new("p", "k", 30, Arc::new(FileKeyReader::new(key_file.path())), clock);
        let token = signer.generate_token(3600).await.unwrap();

        let header = decode_header(&token.value).unwrap();
        assert_eq!(header.alg, Algorithm::EdDSA);
        assert_eq!(header.kid.as_deref(), Some("k"));

        let decoding_key = DecodingKey::from_ed_pem(TEST_PUBLIC_KEY_PEM.as_bytes()).unwrap();
        let data = decode::<TokenClaims>(&token.value, &decoding_key, &Validation::new(Algorithm::EdDSA)).unwrap();
        assert_eq!(data.claims.sub, "p");
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[tokio::test]
    async fn garbage_key_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not a pem").unwrap();
        let signer = TokenSigner::new(
            "p",
            "k",
            30,
            Arc::new(FileKeyReader::new(file.path())),
            Arc::new(ManualClock::new(0)),
        );

        assert!(matches!(signer.generate_token(60).await, Err(CredentialError::KeyMalformed(_))));
    }

    #[tokio::test]
    async fn oversized_ttl_or_skew_is_rejected_before_signing() {
        let key_file = write_signing_key();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_700_000_000_000));
        let reader: Arc<dyn KeyReader> = Arc::new(FileKeyReader::new(key_file.path()));

        let signer = TokenSigner::new("p", "k", 30, reader.clone(), clock.clone());
        for ttl in [u64::MAX, i64::MAX as u64] {
            assert!(matches!(
                signer.generate_token(ttl).await,
                Err(CredentialError::WindowOutOfRange { .. })
            ));
        }

        let skewed = TokenSigner::new("p", "k", u64::MAX, reader, clock);
        assert!(matches!(
            skewed.generate_token(60).await,
            Err(CredentialError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn unconfigured_credential_is_rejected() {
        let config = QWeatherConfig::default();
        assert!(matches!(
            TokenSigner::from_config(&config, Arc::new(ManualClock::new(0))),
            Err(CredentialError::NotConfigured(_))
        ));
    }
}
