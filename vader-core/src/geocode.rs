//! Forward geocoding: place name to coordinates via the Open-Meteo geocoding API.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{error::WeatherError, model::GeocodeResult};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoPlace>,
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    name: String,
    country_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: Client,
    base_url: String,
    language: String,
    timeout: Duration,
}

impl Geocoder {
    pub fn new(language: impl Into<String>) -> Self {
        Self::with_base_url(GEOCODING_URL, language)
    }

    pub fn with_base_url(base_url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            language: language.into(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Best match for `query`. No retries; an empty result set is `NotFound`.
    pub async fn resolve(&self, query: &str) -> Result<GeocodeResult, WeatherError> {
        let response = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[
                ("name", query),
                ("count", "1"),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Geocoding returned status {}", status);
            return Err(WeatherError::Http { status: status.as_u16() });
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("geocoding response: {e}")))?;

        let place = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::NotFound { query: query.to_string() })?;

        let result = GeocodeResult {
            lat: place.latitude.to_string(),
            lon: place.longitude.to_string(),
            name: display_name(&place.name, place.country_code.as_deref()),
        };

        tracing::info!("Geocoded '{}' to {} ({}, {})", query, result.name, result.lat, result.lon);
        Ok(result)
    }
}

fn display_name(name: &str, country_code: Option<&str>) -> String {
    match country_code {
        Some(code) => format!("{name}, {code}").trim().to_string(),
        None => name.trim().to_string(),
    }
}
