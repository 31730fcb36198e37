use std::time::Duration;

use http::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::settings::HttpClientConfig;
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, try_metrics};
use crate::resilience::error::UpstreamFetchError;

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub provider: &'static str,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl UpstreamRequest {
    pub fn new(provider: &'static str, url: &str) -> Result<Self, UpstreamFetchError> {
        let url = Url::parse(url)
            .map_err(|e| UpstreamFetchError::Transport(format!("invalid url '{}': {}", url, e)))?;
        Ok(Self {
            provider,
            url,
            query: Vec::new(),
            bearer: None,
        })
    }

    /// Append one percent-encoded path segment, e.g. a ticker symbol.
    pub fn segment(mut self, segment: &str) -> Result<Self, UpstreamFetchError> {
        let shown = self.url.to_string();
        self.url
            .path_segments_mut()
            .map_err(|_| UpstreamFetchError::Transport(format!("url '{}' cannot take path segments", shown)))?
            .pop_if_empty()
            .push(segment);
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Full `Authorization` header value.
    pub fn authorization(mut self, value: String) -> Self {
        self.bearer = Some(value);
        self
    }
}

/// Generic GET transport shared by every provider adapter.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &HttpClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, request: UpstreamRequest) -> Result<String, UpstreamFetchError> {
        let provider = request.provider;
        let url = request.url.clone();
        let response = self.send(request).await?;
        response.text().await.map_err(|e| {
            let failure = UpstreamFetchError::Transport(e.to_string());
            record_failure(provider, url.as_str(), &failure);
            failure
        })
    }

    /// GET and decode strictly; a missing required field is a malformed payload.
    pub async fn get_json<T: DeserializeOwned>(&self, request: UpstreamRequest) -> Result<T, UpstreamFetchError> {
        let provider = request.provider;
        let url = request.url.clone();
        let body = self.get_text(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            let failure = UpstreamFetchError::Malformed(e.to_string());
            record_failure(provider, url.as_str(), &failure);
            failure
        })
    }

    async fn send(&self, request: UpstreamRequest) -> Result<reqwest::Response, UpstreamFetchError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.upstream_requests.with_label_values(&[request.provider]).inc();
        debug!(provider = request.provider, url = %request.url, "upstream GET");

        let mut builder = self.client.get(request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(value) = &request.bearer {
            builder = builder.header(AUTHORIZATION, value);
        }

        let outcome = match builder.send().await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(UpstreamFetchError::Status(response.status().as_u16())),
            Err(e) => Err(UpstreamFetchError::Transport(e.to_string())),
        };

        metrics
            .upstream_duration
            .with_label_values(&[request.provider])
            .observe(start.elapsed().as_secs_f64());
        if let Err(failure) = &outcome {
            record_failure(request.provider, request.url.as_str(), failure);
        }
        outcome
    }
}

fn record_failure(provider: &str, url: &str, failure: &UpstreamFetchError) {
    error!(provider = provider, url = url, error = %failure, "upstream response error");
    if let Some(metrics) = try_metrics() {
        metrics
            .upstream_failures
            .with_label_values(&[provider, failure.reason()])
            .inc();
    }
}
