use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::helpers::time::{utc_day, Clock};
use crate::providers::error::ServiceError;
use crate::providers::http::{UpstreamClient, UpstreamRequest};
use crate::providers::round_to;
use crate::resilience::error::UpstreamFetchError;
use crate::utils::constants::PROVIDER_EXCHANGE;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExchangeRates {
    pub base: String,
    pub date: String,
    pub rates: BTreeMap<String, f64>,
    /// epoch seconds of the provider's last update
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrencyConversion {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub result: f64,
    pub rate: f64,
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    base_code: Option<String>,
    rates: Option<BTreeMap<String, f64>>,
    time_last_updated: Option<i64>,
}

/// Latest rates and conversions (exchangerate-api).
pub struct ExchangeService {
    client: UpstreamClient,
    url: String,
    clock: Arc<dyn Clock>,
}

impl ExchangeService {
    pub fn new(client: UpstreamClient, url: String, clock: Arc<dyn Clock>) -> Self {
        Self { client, url, clock }
    }

    pub async fn latest_rates(&self, base: &str) -> Result<ExchangeRates, ServiceError> {
        let base = currency_code(base)?;
        let response = self.fetch_latest(&base).await?;
        let rates = response
            .rates
            .ok_or_else(|| UpstreamFetchError::malformed("response has no rates"))?;

        Ok(ExchangeRates {
            base: response.base_code.unwrap_or(base),
            date: utc_day(self.clock.now_millis()),
            rates,
            timestamp: response.time_last_updated.unwrap_or_else(|| self.clock.now_unix()),
        })
    }

    pub async fn convert(&self, from: &str, to: &str, amount: f64) -> Result<CurrencyConversion, ServiceError> {
        let from = currency_code(from)?;
        let to = currency_code(to)?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ServiceError::invalid_input("amount must be a positive number"));
        }

        let response = self.fetch_latest(&from).await?;
        let rates = response
            .rates
            .ok_or_else(|| UpstreamFetchError::malformed("response has no rates"))?;
        let rate = *rates
            .get(&to)
            .ok_or_else(|| ServiceError::invalid_input(format!("currency {} is not supported", to)))?;

        Ok(CurrencyConversion {
            from,
            to,
            amount,
            result: round_to(amount * rate, 2),
            rate: round_to(rate, 4),
            date: utc_day(self.clock.now_millis()),
        })
    }

    async fn fetch_latest(&self, base: &str) -> Result<LatestResponse, UpstreamFetchError> {
        let request = UpstreamRequest::new(PROVIDER_EXCHANGE, &self.url)?.segment(base)?;
        self.client.get_json(request).await
    }
}

/// Three ASCII letters, uppercased.
pub fn currency_code(raw: &str) -> Result<String, ServiceError> {
    let code = raw.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ServiceError::invalid_input(format!(
            "currency code '{}' must be three letters",
            raw
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::HttpClientConfig;
    use crate::helpers::time::ManualClock;
    use httpmock::prelude::*;

    const LATEST_USD: &str =
        r#"{"base_code":"USD","time_last_updated":1714521601,"rates":{"USD":1,"EUR":0.93456,"CNY":7.2391}}"#;

    fn service(server: &MockServer) -> ExchangeService {
        ExchangeService::new(
            UpstreamClient::new(&HttpClientConfig { timeout_ms: 2_000 }).unwrap(),
            server.url("/v4/latest"),
            Arc::new(ManualClock::new(1_714_552_200_000)),
        )
    }

    #[tokio::test]
    async fn latest_rates_for_a_lowercase_base() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/latest/USD");
                then.status(200).body(LATEST_USD);
            })
            .await;

        let rates = service(&server).latest_rates("usd").await.unwrap();

        mock.assert_async().await;
        assert_eq!(rates.base, "USD");
        assert_eq!(rates.timestamp, 1_714_521_601);
        assert_eq!(rates.rates["CNY"], 7.2391);
        assert_eq!(rates.date, "2024-05-01");
    }

    #[tokio::test]
    async fn conversion_rounds_result_and_rate() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/latest/USD");
                then.status(200).body(LATEST_USD);
            })
            .await;

        let conversion = service(&server).convert("USD", "eur", 10.0).await.unwrap();
        assert_eq!(conversion.to, "EUR");
        assert_eq!(conversion.rate, 0.9346);
        assert_eq!(conversion.result, 9.35);
        assert_eq!(conversion.date, "2024-05-01");
    }

    #[tokio::test]
    async fn unsupported_target_and_bad_amount_are_input_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/latest/USD");
                then.status(200).body(LATEST_USD);
            })
            .await;

        let svc = service(&server);
        assert!(matches!(svc.convert("USD", "XYZ", 1.0).await, Err(ServiceError::InvalidInput(_))));
        assert!(matches!(svc.convert("USD", "EUR", 0.0).await, Err(ServiceError::InvalidInput(_))));
        assert!(matches!(svc.latest_rates("US").await, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn missing_rates_are_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/latest/GBP");
                then.status(200).body(r#"{"base_code":"GBP"}"#);
            })
            .await;

        let err = service(&server).latest_rates("GBP").await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(UpstreamFetchError::Malformed(_))));
    }
}
