use serde::{Deserialize, Serialize};

use crate::providers::error::ServiceError;
use crate::providers::http::{UpstreamClient, UpstreamRequest};
use crate::resilience::error::UpstreamFetchError;
use crate::utils::constants::PROVIDER_QUOTES;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

#[derive(Debug, Deserialize)]
struct ZenQuote {
    q: String,
    a: String,
}

/// Random quote (ZenQuotes).
pub struct QuoteService {
    client: UpstreamClient,
    url: String,
}

impl QuoteService {
    pub fn new(client: UpstreamClient, url: String) -> Self {
        Self { client, url }
    }

    pub async fn random_quote(&self) -> Result<Quote, ServiceError> {
        let request = UpstreamRequest::new(PROVIDER_QUOTES, &self.url)?;
        let quotes: Vec<ZenQuote> = self.client.get_json(request).await?;
        let first = quotes
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamFetchError::malformed("quote list is empty"))?;

        let text = first.q.trim();
        if text.is_empty() {
            return Err(UpstreamFetchError::malformed("quote text is empty").into());
        }

        Ok(Quote {
            text: text.to_owned(),
            author: normalize_author(&first.a),
        })
    }
}

/// The provider sometimes prefixes author names with ", ".
fn normalize_author(raw: &str) -> String {
    let author = raw.trim_start().trim_start_matches(',').trim();
    if author.is_empty() {
        "Unknown".to_owned()
    } else {
        author.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::HttpClientConfig;
    use httpmock::prelude::*;

    fn service(server: &MockServer) -> QuoteService {
        QuoteService::new(
            UpstreamClient::new(&HttpClientConfig { timeout_ms: 2_000 }).unwrap(),
            server.url("/api/random"),
        )
    }

    #[tokio::test]
    async fn returns_the_first_quote() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/random");
                then.status(200)
                    .body(r#"[{"q":"Well begun is half done.","a":", Aristotle","h":"<p>ignored</p>"}]"#);
            })
            .await;

        let quote = service(&server).random_quote().await.unwrap();
        assert_eq!(quote.text, "Well begun is half done.");
        assert_eq!(quote.author, "Aristotle");
    }

    #[tokio::test]
    async fn empty_list_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/random");
                then.status(200).body("[]");
            })
            .await;

        let err = service(&server).random_quote().await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(UpstreamFetchError::Malformed(_))));
    }

    #[test]
    fn blank_author_becomes_unknown() {
        assert_eq!(normalize_author(", "), "Unknown");
        assert_eq!(normalize_author("Seneca"), "Seneca");
    }
}
