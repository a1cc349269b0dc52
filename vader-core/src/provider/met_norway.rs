use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::model::Sample;

use super::{
    FetchOptions, PRODUCT_USER_AGENT, ProviderId, WeatherProvider, get_json, into_sample,
    nearest_to_now,
};

const LOCATIONFORECAST_URL: &str = "https://api.met.no/weatherapi/locationforecast/2.0/compact";

/// MET Norway Locationforecast (the data behind Yr).
///
/// Their terms ask for a contact address in the User-Agent; see
/// https://api.met.no/doc/TermsOfService
#[derive(Debug, Clone)]
pub struct MetNorwayProvider {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl MetNorwayProvider {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(LOCATIONFORECAST_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), timeout }
    }

    async fn fetch_current(&self, lat: &str, lon: &str, options: &FetchOptions) -> Result<Sample> {
        let request = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, user_agent(&options.contact))
            .query(&[("lat", lat), ("lon", lon)]);

        let parsed: MetResponse = get_json(request, "MET Norway").await?;
        sample_at(&parsed, Utc::now())
    }
}

/// `SV-Vader/<version> (<contact>)`, or just the product when `contact` is blank.
pub fn user_agent(contact: &str) -> String {
    let contact = contact.trim();
    if contact.is_empty() {
        PRODUCT_USER_AGENT.to_string()
    } else {
        format!("{PRODUCT_USER_AGENT} ({contact})")
    }
}

/// Instant values come from the step nearest `now`; precipitation comes from
/// that step's next-hour block since there is no instant observation of it.
fn sample_at(forecast: &MetResponse, now: DateTime<Utc>) -> Result<Sample> {
    let properties = forecast
        .properties
        .as_ref()
        .ok_or_else(|| anyhow!("MET Norway response contained no properties"))?;

    let step = nearest_to_now(&properties.timeseries, now, |s| s.time.as_str())
        .ok_or_else(|| anyhow!("MET Norway response contained no timeseries"))?;

    let instant = step.data.instant.as_ref().map(|b| &b.details);
    let next_hour = step.data.next_1_hours.as_ref().map(|b| &b.details);

    Ok(Sample::from_raw(
        instant.and_then(|d| d.air_temperature),
        instant.and_then(|d| d.wind_speed),
        next_hour.and_then(|d| d.precipitation_amount),
        instant.and_then(|d| d.cloud_area_fraction),
        None,
    ))
}

#[derive(Debug, Default, Deserialize)]
struct MetInstantDetails {
    air_temperature: Option<f64>,
    wind_speed: Option<f64>,
    cloud_area_fraction: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MetPeriodDetails {
    precipitation_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MetBlock<T> {
    #[serde(default)]
    details: T,
}

#[derive(Debug, Default, Deserialize)]
struct MetData {
    instant: Option<MetBlock<MetInstantDetails>>,
    next_1_hours: Option<MetBlock<MetPeriodDetails>>,
}

#[derive(Debug, Deserialize)]
struct MetStep {
    time: String,
    #[serde(default)]
    data: MetData,
}

#[derive(Debug, Deserialize)]
struct MetProperties {
    #[serde(default)]
    timeseries: Vec<MetStep>,
}

#[derive(Debug, Deserialize)]
struct MetResponse {
    properties: Option<MetProperties>,
}

#[async_trait]
impl WeatherProvider for MetNorwayProvider {
    fn id(&self) -> ProviderId {
        ProviderId::MetNorway
    }

    async fn fetch(&self, lat: &str, lon: &str, options: &FetchOptions) -> Option<Sample> {
        into_sample(self.id(), self.fetch_current(lat, lon, options).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn step(time: &str, temp: f64, precip: Option<f64>) -> serde_json::Value {
        let mut data = serde_json::json!({
            "instant": { "details": {
                "air_temperature": temp,
                "wind_speed": 6.3,
                "cloud_area_fraction": 42.6,
                "air_pressure_at_sea_level": 1012.2
            }}
        });
        if let Some(amount) = precip {
            data["next_1_hours"] = serde_json::json!({
                "summary": { "symbol_code": "rain" },
                "details": { "precipitation_amount": amount }
            });
        }
        serde_json::json!({ "time": time, "data": data })
    }

    fn parse(body: serde_json::Value) -> MetResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn user_agent_without_contact_has_no_parenthetical() {
        assert_eq!(user_agent(""), PRODUCT_USER_AGENT);
        assert_eq!(user_agent("   "), PRODUCT_USER_AGENT);
        assert!(!user_agent("").contains('('));
    }

    #[test]
    fn user_agent_with_contact() {
        let ua = user_agent("a@b.com");
        assert!(ua.starts_with("SV-Vader/"));
        assert!(ua.contains("(a@b.com)"));
    }

    #[test]
    fn picks_nearest_step_and_next_hour_precipitation() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 40, 0).unwrap();
        let forecast = parse(serde_json::json!({
            "type": "Feature",
            "properties": { "timeseries": [
                step("2025-06-01T09:00:00Z", 14.0, Some(0.0)),
                step("2025-06-01T10:00:00Z", 15.5, Some(1.2)),
                step("2025-06-01T11:00:00Z", 17.0, None)
            ]}
        }));

        let sample = sample_at(&forecast, now).unwrap();
        assert_eq!(sample.temperature_c, Some(15.5));
        assert_eq!(sample.wind_speed_ms, Some(6.3));
        assert_eq!(sample.precipitation_mm, Some(1.2));
        assert_eq!(sample.cloud_cover_pct, Some(43));
        assert_eq!(sample.weather_code, None);
    }

    #[test]
    fn step_without_next_hour_has_no_precipitation() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();
        let forecast = parse(serde_json::json!({
            "properties": { "timeseries": [step("2025-06-01T11:00:00Z", 17.0, None)] }
        }));

        let sample = sample_at(&forecast, now).unwrap();
        assert_eq!(sample.temperature_c, Some(17.0));
        assert_eq!(sample.precipitation_mm, None);
    }

    #[test]
    fn step_without_data_is_empty_details() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let forecast = parse(serde_json::json!({
            "properties": { "timeseries": [
                { "time": "2025-06-01T09:00:00Z" },
                step("2025-06-01T10:00:00Z", 15.5, Some(1.2))
            ]}
        }));

        let sample = sample_at(&forecast, now).unwrap();
        assert_eq!(sample.temperature_c, None);
        assert_eq!(sample.wind_speed_ms, None);
        assert_eq!(sample.precipitation_mm, None);
        assert_eq!(sample.cloud_cover_pct, None);
    }

    #[test]
    fn missing_structure_is_an_error() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();
        assert!(sample_at(&parse(serde_json::json!({})), now).is_err());
        assert!(
            sample_at(&parse(serde_json::json!({ "properties": { "timeseries": [] } })), now)
                .is_err()
        );
    }

    #[tokio::test]
    async fn sends_contact_in_user_agent() {
        let mock_server = MockServer::start().await;
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        Mock::given(method("GET"))
            .and(query_param("lat", "59.9139"))
            .and(query_param("lon", "10.7522"))
            .and(header("User-Agent", user_agent("ops@example.com").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "properties": { "timeseries": [step(&now, 8.0, Some(0.2))] }
            })))
            .mount(&mock_server)
            .await;

        let provider = MetNorwayProvider::with_base_url(mock_server.uri(), Duration::from_secs(5));
        let options = FetchOptions { contact: "ops@example.com".into(), language: "sv".into() };
        let sample = provider.fetch("59.9139", "10.7522", &options).await.unwrap();

        assert_eq!(sample.temperature_c, Some(8.0));
        assert_eq!(sample.precipitation_mm, Some(0.2));
    }

    #[tokio::test]
    async fn forbidden_is_no_sample() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("missing User-Agent"))
            .mount(&mock_server)
            .await;

        let provider = MetNorwayProvider::with_base_url(mock_server.uri(), Duration::from_secs(5));
        assert!(provider.fetch("0", "0", &FetchOptions::default()).await.is_none());
    }
}
