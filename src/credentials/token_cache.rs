use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::service::QWeatherConfig;
use crate::credentials::error::CredentialError;
use crate::credentials::signer::TokenSigner;
use crate::credentials::token::Token;
use crate::helpers::time::Clock;
use crate::observability::metrics::get_metrics;

/// Holds at most one live token and renews it once less than
/// `renewal_margin_seconds` of validity remain.
///
/// Constructed once at startup and shared by handle. The cell is replaced
/// whole under the write lock, so readers only ever see complete tokens.
pub struct CredentialTokenCache {
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
    ttl_seconds: u64,
    renewal_margin_seconds: u64,
    cell: RwLock<Option<Arc<Token>>>,
}

impl CredentialTokenCache {
    pub fn new(
        signer: TokenSigner,
        clock: Arc<dyn Clock>,
        ttl_seconds: u64,
        renewal_margin_seconds: u64,
    ) -> Self {
        Self {
            signer,
            clock,
            ttl_seconds,
            renewal_margin_seconds,
            cell: RwLock::new(None),
        }
    }

    pub fn from_config(config: &QWeatherConfig, clock: Arc<dyn Clock>) -> Result<Self, CredentialError> {
        let signer = TokenSigner::from_config(config, clock.clone())?;
        Ok(Self::new(
            signer,
            clock,
            config.token_ttl_seconds,
            config.renewal_margin_seconds,
        ))
    }

    /// Cached token while it is fresh, otherwise a newly signed one.
    ///
    /// Concurrent callers that find the cell stale queue on the write lock;
    /// the first one signs, the rest reuse its token.
    pub async fn get_token(&self) -> Result<Arc<Token>, CredentialError> {
        if let Some(token) = self.fresh(self.cell.read().await.as_ref()) {
            return Ok(token);
        }

        let mut cell = self.cell.write().await;
        if let Some(token) = self.fresh(cell.as_ref()) {
            return Ok(token);
        }

        let metrics = get_metrics().await;
        let token = match self.signer.generate_token(self.ttl_seconds).await {
            Ok(token) => Arc::new(token),
            Err(e) => {
                metrics.token_failures.inc();
                error!("token renewal failed: {}", e);
                return Err(e);
            }
        };

        metrics.token_renewals.inc();
        metrics.token_expiry_unix.set(token.expires_at);
        info!(iat = token.issued_at, exp = token.expires_at, "signed token renewed");

        *cell = Some(token.clone());
        Ok(token)
    }

    /// `Authorization` header value.
    pub async fn bearer(&self) -> Result<String, CredentialError> {
        self.get_token().await.map(|token| token.bearer())
    }

    /// Current cell content without renewing.
    pub async fn peek(&self) -> Option<Arc<Token>> {
        self.cell.read().await.clone()
    }

    fn fresh(&self, cached: Option<&Arc<Token>>) -> Option<Arc<Token>> {
        let now = self.clock.now_unix();
        cached
            .filter(|token| token.is_fresh(now, self.renewal_margin_seconds))
            .cloned()
    }
}
