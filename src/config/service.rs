use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{
    AIR_QUALITY_API, DEFAULT_CLOCK_SKEW_SECS, DEFAULT_MAX_ARTICLES, DEFAULT_RENEWAL_MARGIN_SECS,
    DEFAULT_TOKEN_TTL_SECS, EXCHANGE_RATE_API, QUOTE_API, STOCK_CHART_API, WEATHER_API,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub qweather: QWeatherConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_cities")]
    pub cities: Vec<CityConfig>,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub stocks: StocksConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            settings: SettingsConfig::default(),
            qweather: QWeatherConfig::default(),
            providers: ProvidersConfig::default(),
            cities: default_cities(),
            news: NewsConfig::default(),
            stocks: StocksConfig::default(),
        }
    }
}

/// ================================
/// Signed-token provider (QWeather)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct QWeatherConfig {
    /// `sub` claim
    #[serde(default)]
    pub project_id: String,
    /// `kid` header
    #[serde(default)]
    pub credential_id: String,
    /// PKCS#8 PEM Ed25519 private key
    #[serde(default)]
    pub private_key_path: PathBuf,
    /// e.g. https://abc123.re.qweatherapi.com
    #[serde(default)]
    pub api_host: String,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    /// renew once less than this many seconds of validity remain
    #[serde(default = "default_renewal_margin_seconds")]
    pub renewal_margin_seconds: u64,
    /// subtracted from `iat` to tolerate upstream clock drift
    #[serde(default = "default_clock_skew_seconds")]
    pub clock_skew_seconds: u64,
}

impl Default for QWeatherConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            credential_id: String::new(),
            private_key_path: PathBuf::new(),
            api_host: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
            renewal_margin_seconds: default_renewal_margin_seconds(),
            clock_skew_seconds: default_clock_skew_seconds(),
        }
    }
}

impl QWeatherConfig {
    pub fn is_configured(&self) -> bool {
        !self.project_id.is_empty()
            && !self.credential_id.is_empty()
            && !self.private_key_path.as_os_str().is_empty()
    }
}

/// ================================
/// Upstream base URLs
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    #[serde(default = "default_air_quality_url")]
    pub air_quality_url: String,
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    #[serde(default = "default_exchange_url")]
    pub exchange_url: String,
    #[serde(default = "default_stock_chart_url")]
    pub stock_chart_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            weather_url: default_weather_url(),
            air_quality_url: default_air_quality_url(),
            quote_url: default_quote_url(),
            exchange_url: default_exchange_url(),
            stock_chart_url: default_stock_chart_url(),
        }
    }
}

/// ================================
/// Cities
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CityConfig {
    /// lookup key, matched case-insensitively
    pub key: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl CityConfig {
    pub fn new(key: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            key: key.to_owned(),
            name: name.to_owned(),
            lat,
            lon,
        }
    }
}

/// ================================
/// News
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    /// category -> (source name -> feed url)
    #[serde(default = "default_news_categories")]
    pub categories: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            categories: default_news_categories(),
            max_articles: default_max_articles(),
        }
    }
}

/// ================================
/// Stocks
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct StocksConfig {
    #[serde(default = "default_indices")]
    pub indices: Vec<IndexConfig>,
}

impl Default for StocksConfig {
    fn default() -> Self {
        Self {
            indices: default_indices(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub symbol: String,
    pub name: String,
}

impl IndexConfig {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_owned(),
            name: name.to_owned(),
        }
    }
}

fn default_token_ttl_seconds() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_renewal_margin_seconds() -> u64 {
    DEFAULT_RENEWAL_MARGIN_SECS
}

fn default_clock_skew_seconds() -> u64 {
    DEFAULT_CLOCK_SKEW_SECS
}

fn default_weather_url() -> String {
    WEATHER_API.to_owned()
}

fn default_air_quality_url() -> String {
    AIR_QUALITY_API.to_owned()
}

fn default_quote_url() -> String {
    QUOTE_API.to_owned()
}

fn default_exchange_url() -> String {
    EXCHANGE_RATE_API.to_owned()
}

fn default_stock_chart_url() -> String {
    STOCK_CHART_API.to_owned()
}

fn default_max_articles() -> usize {
    DEFAULT_MAX_ARTICLES
}

pub fn default_cities() -> Vec<CityConfig> {
    vec![
        CityConfig::new("beijing", "Beijing", 39.9042, 116.4074),
        CityConfig::new("shanghai", "Shanghai", 31.2304, 121.4737),
        CityConfig::new("shenzhen", "Shenzhen", 22.5431, 114.0579),
        CityConfig::new("hangzhou", "Hangzhou", 30.2741, 120.155),
        CityConfig::new("guangzhou", "Guangzhou", 23.1291, 113.2644),
    ]
}

pub fn default_news_categories() -> BTreeMap<String, BTreeMap<String, String>> {
    let technology = BTreeMap::from([
        ("Hacker News".to_owned(), "https://news.ycombinator.com/rss".to_owned()),
        ("TechCrunch".to_owned(), "https://techcrunch.com/feed/".to_owned()),
    ]);
    let general = BTreeMap::from([
        ("BBC News".to_owned(), "http://feeds.bbci.co.uk/news/rss.xml".to_owned()),
        ("CNN Top Stories".to_owned(), "http://rss.cnn.com/rss/cnn_topstories.rss".to_owned()),
    ]);
    BTreeMap::from([
        ("technology".to_owned(), technology),
        ("general".to_owned(), general),
    ])
}

pub fn default_indices() -> Vec<IndexConfig> {
    vec![
        IndexConfig::new("^GSPC", "S&P 500"),
        IndexConfig::new("^DJI", "Dow Jones"),
        IndexConfig::new("^IXIC", "NASDAQ"),
        IndexConfig::new("^FTSE", "FTSE 100"),
        IndexConfig::new("000001.SS", "Shanghai Composite"),
        IndexConfig::new("399001.SZ", "Shenzhen Component"),
    ]
}
