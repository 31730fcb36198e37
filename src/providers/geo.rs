use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::{CredentialError, CredentialTokenCache};
use crate::providers::error::ServiceError;
use crate::providers::http::{UpstreamClient, UpstreamRequest};
use crate::resilience::error::UpstreamFetchError;
use crate::utils::constants::{CITY_LOOKUP_PATH, PROVIDER_GEO};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CityLocation {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CityLocations {
    pub locations: Vec<CityLocation>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    code: String,
    #[serde(default)]
    location: Vec<LookupEntry>,
}

#[derive(Debug, Deserialize)]
struct LookupEntry {
    id: String,
    name: String,
    lat: String,
    lon: String,
    adm1: Option<String>,
    adm2: Option<String>,
    country: Option<String>,
    tz: Option<String>,
}

impl LookupEntry {
    fn into_location(self) -> Result<CityLocation, UpstreamFetchError> {
        let latitude = parse_coordinate(&self.lat, "lat")?;
        let longitude = parse_coordinate(&self.lon, "lon")?;
        Ok(CityLocation {
            id: self.id,
            name: self.name,
            latitude,
            longitude,
            adm1: self.adm1,
            adm2: self.adm2,
            country: self.country,
            timezone: self.tz,
        })
    }
}

fn parse_coordinate(raw: &str, field: &str) -> Result<f64, UpstreamFetchError> {
    raw.trim()
        .parse()
        .map_err(|_| UpstreamFetchError::malformed(format!("{} '{}' is not a number", field, raw)))
}

/// City search against the signed-token GeoAPI.
pub struct CityLookupService {
    client: UpstreamClient,
    api_host: String,
    credentials: Option<Arc<CredentialTokenCache>>,
}

impl CityLookupService {
    pub fn new(client: UpstreamClient, api_host: String, credentials: Option<Arc<CredentialTokenCache>>) -> Self {
        Self {
            client,
            api_host: api_host.trim_end_matches('/').to_owned(),
            credentials,
        }
    }

    pub async fn lookup(&self, location: &str) -> Result<CityLocations, ServiceError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(ServiceError::invalid_input("location must not be empty"));
        }
        if self.api_host.is_empty() {
            return Err(ServiceError::Unavailable("city lookup host is not configured".to_owned()));
        }
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            CredentialError::NotConfigured("city lookup requires the qweather credential".to_owned())
        })?;

        // credential failures surface before any upstream call is made
        let authorization = credentials.bearer().await?;
        let url = format!("{}{}", self.api_host, CITY_LOOKUP_PATH);
        let request = UpstreamRequest::new(PROVIDER_GEO, &url)?
            .query("location", location)
            .authorization(authorization);

        let response: LookupResponse = self.client.get_json(request).await?;
        if response.code != "200" {
            return Err(UpstreamFetchError::malformed(format!("provider returned code {}", response.code)).into());
        }

        let locations = response
            .location
            .into_iter()
            .map(LookupEntry::into_location)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(location = location, found = locations.len(), "city lookup done");

        Ok(CityLocations { locations })
    }
}
