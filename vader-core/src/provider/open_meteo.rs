use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::model::Sample;

use super::{FetchOptions, ProviderId, WeatherProvider, get_json, into_sample};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m,weather_code,precipitation,cloud_cover";
const TIMEZONE: &str = "Europe/Stockholm";

/// Open-Meteo forecast API. Free and keyless; the only source of WMO codes.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenMeteoProvider {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(FORECAST_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), timeout }
    }

    async fn fetch_current(&self, lat: &str, lon: &str, options: &FetchOptions) -> Result<Sample> {
        let language = if options.language.is_empty() { "sv" } else { options.language.as_str() };

        let request = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[
                ("latitude", lat),
                ("longitude", lon),
                ("current", CURRENT_FIELDS),
                ("timezone", TIMEZONE),
                ("lang", language),
            ]);

        let parsed: OmResponse = get_json(request, "Open-Meteo").await?;
        let current = parsed
            .current
            .ok_or_else(|| anyhow!("Open-Meteo response contained no current block"))?;

        Ok(Sample::from_raw(
            current.temperature_2m,
            current.wind_speed_10m,
            current.precipitation,
            current.cloud_cover.map(f64::trunc),
            current.weather_code,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    precipitation: Option<f64>,
    cloud_cover: Option<f64>,
    weather_code: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: Option<OmCurrent>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn fetch(&self, lat: &str, lon: &str, options: &FetchOptions) -> Option<Sample> {
        into_sample(self.id(), self.fetch_current(lat, lon, options).await)
    }
}
