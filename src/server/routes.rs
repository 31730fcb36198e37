use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::providers::exchange::{currency_code, CurrencyConversion, ExchangeRates};
use crate::providers::geo::CityLocations;
use crate::providers::news::NewsHeadlines;
use crate::providers::quotes::Quote;
use crate::providers::stocks::{MarketIndices, StockQuote};
use crate::providers::weather::{AirQuality, Weather};
use crate::server::response::{ApiError, ApiResult, ApiSuccess};
use crate::server::server::AppState;
use crate::utils::constants::DEFAULT_NEWS_CATEGORY;

/// Provider routes, mounted under the configured api prefix.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/weather/cities", get(get_cities))
        .route("/weather/air-quality", get(get_air_quality))
        .route("/weather/city", get(lookup_city))
        .route("/quote", get(get_quote))
        .route("/exchange/latest", get(get_latest_rates))
        .route("/exchange/convert", get(convert_currency))
        .route("/stock/indices", get(get_indices))
        .route("/stock/quote", get(get_stock_quote))
        .route("/news/headlines", get(get_headlines))
}

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BaseQuery {
    base: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    from: Option<String>,
    to: Option<String>,
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    category: Option<String>,
}

/// Trimmed, non-empty query value.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, code: &str, message: &str) -> Result<String, ApiError> {
    present(value).ok_or_else(|| ApiError::bad_request(code, message))
}

async fn get_weather(State(state): State<AppState>, Query(query): Query<CityQuery>) -> ApiResult<Weather> {
    let city = required(query.city, "MISSING_CITY", "query parameter 'city' is required")?;
    state
        .services
        .weather
        .get_weather(&city)
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("WEATHER_ERROR", e))
}

async fn get_cities(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(ApiSuccess::new(state.services.weather.supported_cities()))
}

async fn get_air_quality(State(state): State<AppState>, Query(query): Query<CityQuery>) -> ApiResult<AirQuality> {
    let city = required(query.city, "MISSING_CITY", "query parameter 'city' is required")?;
    state
        .services
        .weather
        .get_air_quality(&city)
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("AIR_QUALITY_ERROR", e))
}

async fn lookup_city(State(state): State<AppState>, Query(query): Query<LocationQuery>) -> ApiResult<CityLocations> {
    let location = required(query.location, "MISSING_LOCATION", "query parameter 'location' is required")?;
    state
        .services
        .geo
        .lookup(&location)
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("CITY_LOOKUP_ERROR", e))
}

async fn get_quote(State(state): State<AppState>) -> ApiResult<Quote> {
    state
        .services
        .quotes
        .random_quote()
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("QUOTE_ERROR", e))
}

async fn get_latest_rates(State(state): State<AppState>, Query(query): Query<BaseQuery>) -> ApiResult<ExchangeRates> {
    let raw = present(query.base).unwrap_or_else(|| "USD".to_owned());
    let base = currency_code(&raw).map_err(|e| ApiError::bad_request("INVALID_CURRENCY", e.to_string()))?;
    state
        .services
        .exchange
        .latest_rates(&base)
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("EXCHANGE_ERROR", e))
}

async fn convert_currency(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> ApiResult<CurrencyConversion> {
    let (Some(from), Some(to), Some(amount)) = (present(query.from), present(query.to), present(query.amount)) else {
        return Err(ApiError::bad_request(
            "MISSING_PARAMS",
            "query parameters 'from', 'to' and 'amount' are required",
        ));
    };
    let from = currency_code(&from).map_err(|e| ApiError::bad_request("INVALID_CURRENCY", e.to_string()))?;
    let to = currency_code(&to).map_err(|e| ApiError::bad_request("INVALID_CURRENCY", e.to_string()))?;
    let amount = amount
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .ok_or_else(|| ApiError::bad_request("INVALID_AMOUNT", "amount must be a positive number"))?;

    state
        .services
        .exchange
        .convert(&from, &to, amount)
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("CONVERSION_ERROR", e))
}

async fn get_indices(State(state): State<AppState>) -> ApiResult<MarketIndices> {
    state
        .services
        .stocks
        .get_major_indices()
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("INDICES_ERROR", e))
}

async fn get_stock_quote(State(state): State<AppState>, Query(query): Query<SymbolQuery>) -> ApiResult<StockQuote> {
    let symbol = required(query.symbol, "MISSING_SYMBOL", "query parameter 'symbol' is required")?;
    state
        .services
        .stocks
        .get_quote(&symbol)
        .await
        .map(ApiSuccess::new)
        .map_err(|e| ApiError::from_service("QUOTE_ERROR", e))
}

async fn get_headlines(State(state): State<AppState>, Query(query): Query<CategoryQuery>) -> ApiResult<NewsHeadlines> {
    let category = present(query.category).unwrap_or_else(|| DEFAULT_NEWS_CATEGORY.to_owned());
    state
        .services
        .news
        .get_headlines(&category)
        .await
        .map(|headlines| {
            if headlines.unavailable_sources.is_empty() {
                ApiSuccess::new(headlines)
            } else {
                let message = format!("some sources unavailable: {}", headlines.unavailable_sources.join(", "));
                ApiSuccess::new(headlines).with_message(message)
            }
        })
        .map_err(|e| ApiError::from_service("NEWS_ERROR", e))
}
