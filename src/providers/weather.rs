use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::service::CityConfig;
use crate::helpers::time::{serialize_iso_millis, utc_from_millis, Clock};
use crate::providers::error::ServiceError;
use crate::providers::http::{UpstreamClient, UpstreamRequest};
use crate::providers::round_to;
use crate::resilience::error::UpstreamFetchError;
use crate::utils::constants::{PROVIDER_AIR_QUALITY, PROVIDER_WEATHER};

const WEATHER_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m";
const AIR_QUALITY_FIELDS: &str = "us_aqi,pm2_5,pm10,nitrogen_dioxide,ozone,carbon_monoxide";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub condition: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub feels_like: f64,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: i64,
    pub category: String,
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub o3: f64,
    pub co: f64,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    current: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    weather_code: i64,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    current: Option<CurrentAirQuality>,
}

#[derive(Debug, Deserialize)]
struct CurrentAirQuality {
    us_aqi: f64,
    pm2_5: f64,
    pm10: f64,
    nitrogen_dioxide: f64,
    ozone: f64,
    carbon_monoxide: f64,
}

/// Current conditions and air quality for the configured cities (Open-Meteo).
pub struct WeatherService {
    client: UpstreamClient,
    weather_url: String,
    air_quality_url: String,
    cities: Vec<CityConfig>,
    clock: Arc<dyn Clock>,
}

impl WeatherService {
    pub fn new(
        client: UpstreamClient,
        weather_url: String,
        air_quality_url: String,
        cities: Vec<CityConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            weather_url,
            air_quality_url,
            cities,
            clock,
        }
    }

    pub fn supported_cities(&self) -> Vec<String> {
        self.cities.iter().map(|city| city.name.clone()).collect()
    }

    pub async fn get_weather(&self, city: &str) -> Result<Weather, ServiceError> {
        let target = self.find_city(city)?;
        let request = UpstreamRequest::new(PROVIDER_WEATHER, &self.weather_url)?
            .query("latitude", target.lat)
            .query("longitude", target.lon)
            .query("current", WEATHER_FIELDS)
            .query("timezone", "auto");

        let response: ForecastResponse = self.client.get_json(request).await?;
        let current = response
            .current
            .ok_or_else(|| UpstreamFetchError::malformed("response has no current weather block"))?;

        Ok(Weather {
            city: target.name.clone(),
            latitude: response.latitude.unwrap_or(target.lat),
            longitude: response.longitude.unwrap_or(target.lon),
            temperature: round_to(current.temperature_2m, 1),
            condition: describe_weather_code(current.weather_code).to_owned(),
            humidity: round_to(current.relative_humidity_2m, 1),
            wind_speed: round_to(current.wind_speed_10m, 1),
            feels_like: round_to(current.apparent_temperature, 1),
            updated_at: utc_from_millis(self.clock.now_millis()),
        })
    }

    pub async fn get_air_quality(&self, city: &str) -> Result<AirQuality, ServiceError> {
        let target = self.find_city(city)?;
        let request = UpstreamRequest::new(PROVIDER_AIR_QUALITY, &self.air_quality_url)?
            .query("latitude", target.lat)
            .query("longitude", target.lon)
            .query("current", AIR_QUALITY_FIELDS);

        let response: AirQualityResponse = self.client.get_json(request).await?;
        let current = response
            .current
            .ok_or_else(|| UpstreamFetchError::malformed("response has no current air quality block"))?;
        let aqi = current.us_aqi.round() as i64;

        Ok(AirQuality {
            city: target.name.clone(),
            latitude: response.latitude.unwrap_or(target.lat),
            longitude: response.longitude.unwrap_or(target.lon),
            aqi,
            category: aqi_category(aqi).to_owned(),
            pm25: round_to(current.pm2_5, 1),
            pm10: round_to(current.pm10, 1),
            no2: round_to(current.nitrogen_dioxide, 1),
            o3: round_to(current.ozone, 1),
            co: round_to(current.carbon_monoxide, 1),
            updated_at: utc_from_millis(self.clock.now_millis()),
        })
    }

    fn find_city(&self, city: &str) -> Result<&CityConfig, ServiceError> {
        let key = city.trim().to_lowercase();
        self.cities.iter().find(|c| c.key == key).ok_or_else(|| {
            ServiceError::invalid_input(format!(
                "city \"{}\" is not supported, supported cities: {}",
                city,
                self.supported_cities().join(", ")
            ))
        })
    }
}

/// WMO weather interpretation code.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Sunny",
        1 => "Partly Cloudy",
        2 => "Cloudy",
        3 => "Overcast",
        45 | 48 => "Foggy",
        51 => "Light Drizzle",
        53 => "Moderate Drizzle",
        55 => "Heavy Drizzle",
        61 => "Slight Rain",
        63 => "Moderate Rain",
        65 => "Heavy Rain",
        71 => "Slight Snow",
        73 => "Moderate Snow",
        75 => "Heavy Snow",
        80 => "Slight Rain Showers",
        81 => "Moderate Rain Showers",
        82 => "Heavy Rain Showers",
        85 => "Slight Snow Showers",
        86 => "Heavy Snow Showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with Hail",
        _ => "Unknown",
    }
}

/// US EPA AQI band.
pub fn aqi_category(aqi: i64) -> &'static str {
    match aqi {
        i64::MIN..=50 => "Good",
        51..=100 => "Moderate",
        101..=150 => "Unhealthy for Sensitive Groups",
        151..=200 => "Unhealthy",
        201..=300 => "Very Unhealthy",
        _ => "Hazardous",
    }
}
