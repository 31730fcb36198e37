//! Shared constants and defaults

pub const DEFAULT_CONFIG_PATH: &str = "backend-forge.yaml";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_API_PREFIX: &str = "/api";

// Signed credential
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;
pub const DEFAULT_RENEWAL_MARGIN_SECS: u64 = 300;
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 30;
pub const MAX_TOKEN_TTL_SECS: u64 = 86_400;
pub const MAX_CLOCK_SKEW_SECS: u64 = 3_600;

// Upstream endpoints
pub const WEATHER_API: &str = "https://api.open-meteo.com/v1/forecast";
pub const AIR_QUALITY_API: &str = "https://air-quality.open-meteo.com/v1/air-quality";
pub const QUOTE_API: &str = "https://zenquotes.io/api/random";
pub const EXCHANGE_RATE_API: &str = "https://api.exchangerate-api.com/v4/latest";
pub const STOCK_CHART_API: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const CITY_LOOKUP_PATH: &str = "/geo/v2/city/lookup";

// News
pub const DEFAULT_MAX_ARTICLES: usize = 50;
pub const DEFAULT_NEWS_CATEGORY: &str = "general";
pub const DESCRIPTION_FALLBACK_CHARS: usize = 100;

// Provider names, used as log fields and metric labels
pub const PROVIDER_WEATHER: &str = "open-meteo";
pub const PROVIDER_AIR_QUALITY: &str = "open-meteo-air";
pub const PROVIDER_QUOTES: &str = "zenquotes";
pub const PROVIDER_EXCHANGE: &str = "exchangerate-api";
pub const PROVIDER_STOCKS: &str = "yahoo-chart";
pub const PROVIDER_NEWS: &str = "rss";
pub const PROVIDER_GEO: &str = "qweather-geo";

// Aggregation names
pub const AGGREGATION_NEWS: &str = "news";
pub const AGGREGATION_INDICES: &str = "indices";
