//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks server, logging, credential, provider url, city, news and index invariants

use std::collections::HashSet;

use reqwest::Url;
use tracing::{error, info};

use crate::config::service::{CityConfig, IndexConfig, NewsConfig, QWeatherConfig, ServiceConfig};
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{MAX_CLOCK_SKEW_SECS, MAX_TOKEN_TTL_SECS};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_qweather(&cfg.qweather, &mut errors);

    let providers = &cfg.providers;
    for (field, url) in [
        ("providers.weather_url", &providers.weather_url),
        ("providers.air_quality_url", &providers.air_quality_url),
        ("providers.quote_url", &providers.quote_url),
        ("providers.exchange_url", &providers.exchange_url),
        ("providers.stock_chart_url", &providers.stock_chart_url),
    ] {
        validate_url(field, url, &mut errors);
    }

    validate_cities(&cfg.cities, &mut errors);
    validate_news(&cfg.news, &mut errors);
    validate_indices(&cfg.stocks.indices, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.port == 0 {
        errors.push("settings.server.port must be in 1..=65535".to_string());
    }
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
    if settings.http.timeout_ms == 0 {
        errors.push("settings.http.timeout_ms must be > 0".to_string());
    }
    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }
}

fn validate_qweather(qweather: &QWeatherConfig, errors: &mut Vec<String>) {
    if qweather.token_ttl_seconds == 0 || qweather.token_ttl_seconds > MAX_TOKEN_TTL_SECS {
        errors.push(format!(
            "qweather.token_ttl_seconds ({}) must be in 1..={}",
            qweather.token_ttl_seconds, MAX_TOKEN_TTL_SECS
        ));
    }
    if qweather.clock_skew_seconds > MAX_CLOCK_SKEW_SECS {
        errors.push(format!(
            "qweather.clock_skew_seconds ({}) must be at most {}",
            qweather.clock_skew_seconds, MAX_CLOCK_SKEW_SECS
        ));
    }
    if qweather.renewal_margin_seconds >= qweather.token_ttl_seconds {
        errors.push(format!(
            "qweather.renewal_margin_seconds ({}) must be lower than token_ttl_seconds ({})",
            qweather.renewal_margin_seconds, qweather.token_ttl_seconds
        ));
    }
    if !qweather.api_host.is_empty() {
        validate_url("qweather.api_host", &qweather.api_host, errors);
    }
}

fn validate_url(field: &str, url: &str, errors: &mut Vec<String>) {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(format!(
            "{} '{}' has unsupported scheme '{}'",
            field,
            url,
            parsed.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not a valid url: {}", field, url, e)),
    }
}

fn validate_cities(cities: &[CityConfig], errors: &mut Vec<String>) {
    if cities.is_empty() {
        errors.push("cities is empty; at least one city required".to_string());
    }
    let mut keys = HashSet::new();
    for city in cities {
        if !keys.insert(city.key.as_str()) {
            errors.push(format!("cities: duplicate key '{}'", city.key));
        }
        if !(-90.0..=90.0).contains(&city.lat) || !(-180.0..=180.0).contains(&city.lon) {
            errors.push(format!("cities['{}']: coordinates out of range", city.key));
        }
    }
}

fn validate_news(news: &NewsConfig, errors: &mut Vec<String>) {
    if news.max_articles == 0 {
        errors.push("news.max_articles must be > 0".to_string());
    }
    if news.categories.is_empty() {
        errors.push("news.categories is empty; at least one category required".to_string());
    }
    for (category, sources) in &news.categories {
        if sources.is_empty() {
            errors.push(format!("news.categories['{}'] has no feed sources", category));
        }
        for (source, url) in sources {
            validate_url(&format!("news.categories['{}']['{}']", category, source), url, errors);
        }
    }
}

fn validate_indices(indices: &[IndexConfig], errors: &mut Vec<String>) {
    if indices.is_empty() {
        errors.push("stocks.indices is empty; at least one index required".to_string());
    }
    let mut symbols = HashSet::new();
    for index in indices {
        if index.symbol.is_empty() {
            errors.push("stocks.indices: symbol must not be empty".to_string());
        } else if !symbols.insert(index.symbol.as_str()) {
            errors.push(format!("stocks.indices: duplicate symbol '{}'", index.symbol));
        }
    }
}
