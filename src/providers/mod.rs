use std::sync::Arc;

use tracing::{info, warn};

use crate::config::service::ServiceConfig;
use crate::credentials::CredentialTokenCache;
use crate::helpers::time::Clock;

pub mod error;
pub mod exchange;
pub mod geo;
pub mod http;
pub mod news;
pub mod quotes;
pub mod rss;
pub mod stocks;
pub mod weather;

use self::exchange::ExchangeService;
use self::geo::CityLookupService;
use self::http::UpstreamClient;
use self::news::NewsService;
use self::quotes::QuoteService;
use self::stocks::StockService;
use self::weather::WeatherService;

/// Every provider adapter, built once at startup and shared by the handlers.
pub struct ProviderServices {
    pub weather: WeatherService,
    pub geo: CityLookupService,
    pub quotes: QuoteService,
    pub exchange: ExchangeService,
    pub stocks: StockService,
    pub news: NewsService,
}

impl ProviderServices {
    pub fn from_config(config: &ServiceConfig, client: UpstreamClient, clock: Arc<dyn Clock>) -> Self {
        let credentials = match CredentialTokenCache::from_config(&config.qweather, clock.clone()) {
            Ok(cache) => {
                info!(kid = %config.qweather.credential_id, "signed credential cache ready");
                Some(Arc::new(cache))
            }
            Err(e) => {
                warn!("city lookup disabled: {}", e);
                None
            }
        };

        let providers = &config.providers;
        Self {
            weather: WeatherService::new(
                client.clone(),
                providers.weather_url.clone(),
                providers.air_quality_url.clone(),
                config.cities.clone(),
                clock.clone(),
            ),
            geo: CityLookupService::new(client.clone(), config.qweather.api_host.clone(), credentials),
            quotes: QuoteService::new(client.clone(), providers.quote_url.clone()),
            exchange: ExchangeService::new(client.clone(), providers.exchange_url.clone(), clock.clone()),
            stocks: StockService::new(
                client.clone(),
                providers.stock_chart_url.clone(),
                config.stocks.indices.clone(),
                clock.clone(),
            ),
            news: NewsService::new(client, config.news.clone(), clock),
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(-1.005, 0), -1.0);
        assert_eq!(round_to(0.123456, 4), 0.1235);
    }
}
