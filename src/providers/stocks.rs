use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::service::IndexConfig;
use crate::helpers::time::{serialize_iso_millis, utc_from_millis, Clock};
use crate::providers::error::ServiceError;
use crate::providers::http::{UpstreamClient, UpstreamRequest};
use crate::providers::round_to;
use crate::resilience::error::UpstreamFetchError;
use crate::resilience::fan_out::{FanOutAggregator, FetchTask};
use crate::utils::constants::{AGGREGATION_INDICES, PROVIDER_STOCKS};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    /// epoch seconds of the observation
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndices {
    pub indices: Vec<StockQuote>,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub updated_at: DateTime<Utc>,
}

// ---- chart endpoint wire format ----

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_time: Option<i64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn last_value(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().find_map(|value| *value)
}

fn required(value: Option<f64>, field: &str) -> Result<f64, UpstreamFetchError> {
    value.ok_or_else(|| UpstreamFetchError::malformed(format!("chart has no {}", field)))
}

/// Quotes from the Yahoo chart endpoint, single and fanned out over the
/// configured index list.
pub struct StockService {
    client: UpstreamClient,
    chart_url: String,
    indices: Vec<IndexConfig>,
    clock: Arc<dyn Clock>,
}

impl StockService {
    pub fn new(client: UpstreamClient, chart_url: String, indices: Vec<IndexConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            chart_url,
            indices,
            clock,
        }
    }

    pub async fn get_quote(&self, symbol: &str) -> Result<StockQuote, ServiceError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ServiceError::invalid_input("symbol must not be empty"));
        }
        Ok(self.fetch_quote(&symbol).await?)
    }

    /// All configured indices, newest observation first. Fails only when no
    /// index could be fetched.
    pub async fn get_major_indices(&self) -> Result<MarketIndices, ServiceError> {
        let tasks = self
            .indices
            .iter()
            .map(|index| FetchTask::single(index.symbol.clone(), self.fetch_quote(&index.symbol)))
            .collect();

        let result = FanOutAggregator::new(AGGREGATION_INDICES)
            .run(tasks, |a: &StockQuote, b: &StockQuote| b.timestamp.cmp(&a.timestamp))
            .await?;
        info!(
            fetched = result.succeeded.len(),
            failed = result.failures.len(),
            "market indices aggregated"
        );

        Ok(MarketIndices {
            indices: result.items,
            updated_at: utc_from_millis(self.clock.now_millis()),
        })
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, UpstreamFetchError> {
        let request = UpstreamRequest::new(PROVIDER_STOCKS, &self.chart_url)?
            .segment(symbol)?
            .query("interval", "1d")
            .query("range", "1d");
        let envelope: ChartEnvelope = self.client.get_json(request).await?;
        self.build_quote(symbol, envelope)
    }

    fn build_quote(&self, symbol: &str, envelope: ChartEnvelope) -> Result<StockQuote, UpstreamFetchError> {
        if let Some(error) = envelope.chart.error {
            let reason = error
                .description
                .or(error.code)
                .unwrap_or_else(|| "unspecified".to_owned());
            return Err(UpstreamFetchError::malformed(format!("provider error: {}", reason)));
        }
        let result = envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| UpstreamFetchError::malformed("chart result is empty"))?;

        let series = result
            .indicators
            .and_then(|indicators| indicators.quote.into_iter().next())
            .unwrap_or_default();
        let meta = result.meta;

        let current = required(last_value(&series.close).or(meta.regular_market_price), "current price")?;
        let open = required(last_value(&series.open), "open price")?;
        let high = required(last_value(&series.high).or(meta.regular_market_day_high), "high price")?;
        let low = required(last_value(&series.low).or(meta.regular_market_day_low), "low price")?;
        let previous_close = required(meta.previous_close.or(meta.chart_previous_close), "previous close")?;
        let timestamp = result
            .timestamp
            .last()
            .copied()
            .or(meta.regular_market_time)
            .ok_or_else(|| UpstreamFetchError::malformed("chart has no timestamp"))?;

        let change = current - previous_close;
        let change_percent = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        let name = self
            .indices
            .iter()
            .find(|index| index.symbol == symbol)
            .map(|index| index.name.clone())
            .or(meta.symbol)
            .unwrap_or_else(|| symbol.to_owned());

        Ok(StockQuote {
            symbol: symbol.to_owned(),
            name,
            current_price: round_to(current, 2),
            open_price: round_to(open, 2),
            high_price: round_to(high, 2),
            low_price: round_to(low, 2),
            previous_close: round_to(previous_close, 2),
            change: round_to(change, 2),
            change_percent: round_to(change_percent, 2),
            timestamp,
        })
    }
}
