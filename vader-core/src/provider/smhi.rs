use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::model::Sample;

use super::{
    FetchOptions, PRODUCT_USER_AGENT, ProviderId, WeatherProvider, get_json, into_sample,
    nearest_to_now,
};

const POINT_FORECAST_URL: &str =
    "https://opendata.smhi.se/meteorological/forecast/api/category/pmp3g/version/2/geotype/point";

/// SMHI point forecast (pmp3g v2).
#[derive(Debug, Clone)]
pub struct SmhiProvider {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl SmhiProvider {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(POINT_FORECAST_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), timeout }
    }

    fn forecast_url(&self, lat: &str, lon: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid SMHI base URL '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("SMHI base URL cannot take path segments"))?
            .pop_if_empty()
            .extend(["lon", lon, "lat", lat, "data.json"]);
        Ok(url)
    }

    async fn fetch_current(&self, lat: &str, lon: &str) -> Result<Sample> {
        let request = self
            .http
            .get(self.forecast_url(lat, lon)?)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, PRODUCT_USER_AGENT);

        let parsed: SmhiResponse = get_json(request, "SMHI").await?;
        sample_at(&parsed, Utc::now())
    }
}

/// Picks the forecast step nearest `now` and normalises it.
fn sample_at(forecast: &SmhiResponse, now: DateTime<Utc>) -> Result<Sample> {
    let step = nearest_to_now(&forecast.time_series, now, |s| s.valid_time.as_str())
        .ok_or_else(|| anyhow!("SMHI response contained no time series"))?;

    if step.parameters.is_empty() {
        return Err(anyhow!("SMHI forecast step {} has no parameters", step.valid_time));
    }

    let value = |name: &str| {
        step.parameters
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.values.first().copied())
    };

    Ok(Sample::from_raw(
        value("t"),
        value("ws"),
        value("pmean"),
        value("tcc").map(okta_to_percent),
        None,
    ))
}

/// Cloud cover in eighths (0..=8) to percent.
pub fn okta_to_percent(oktas: f64) -> f64 {
    (oktas / 8.0 * 100.0).round()
}

#[derive(Debug, Deserialize)]
struct SmhiParameter {
    name: String,
    #[serde(default)]
    values: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmhiStep {
    valid_time: String,
    #[serde(default)]
    parameters: Vec<SmhiParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmhiResponse {
    #[serde(default)]
    time_series: Vec<SmhiStep>,
}

#[async_trait]
impl WeatherProvider for SmhiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Smhi
    }

    async fn fetch(&self, lat: &str, lon: &str, _options: &FetchOptions) -> Option<Sample> {
        into_sample(self.id(), self.fetch_current(lat, lon).await)
    }
}
