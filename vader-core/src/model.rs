use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// One provider's reading, normalised to °C, m/s, mm and percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub cloud_cover_pct: Option<u8>,
    pub weather_code: Option<i32>,
    /// Always `None` from adapters; set by the consensus reducer.
    pub description: Option<String>,
}

impl Sample {
    /// Builds a sample from raw provider numbers, dropping anything non-finite.
    /// Cloud cover is rounded to a whole percent and clamped into 0..=100.
    pub fn from_raw(
        temperature_c: Option<f64>,
        wind_speed_ms: Option<f64>,
        precipitation_mm: Option<f64>,
        cloud_cover_pct: Option<f64>,
        weather_code: Option<f64>,
    ) -> Self {
        Self {
            temperature_c: finite(temperature_c),
            wind_speed_ms: finite(wind_speed_ms),
            precipitation_mm: finite(precipitation_mm),
            cloud_cover_pct: finite(cloud_cover_pct)
                .map(|pct| pct.round().clamp(0.0, 100.0) as u8),
            weather_code: finite(weather_code).map(|code| code.trunc() as i32),
            description: None,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Coordinates and display name produced by the geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: String,
    pub lon: String,
    pub name: String,
}

/// A request for the current weather at a place or coordinate pair.
#[derive(Debug, Clone, Default)]
pub struct WeatherQuery {
    pub place: String,
    pub lat: String,
    pub lon: String,
    /// Adapters to consult; order is the priority used for the weather code.
    pub providers: Vec<ProviderId>,
    /// Contact string for the MET Norway User-Agent.
    pub contact: String,
}

impl WeatherQuery {
    pub fn for_place(place: impl Into<String>, providers: Vec<ProviderId>) -> Self {
        Self { place: place.into(), providers, ..Self::default() }
    }

    pub fn for_coordinates(
        lat: impl Into<String>,
        lon: impl Into<String>,
        providers: Vec<ProviderId>,
    ) -> Self {
        Self { lat: lat.into(), lon: lon.into(), providers, ..Self::default() }
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = place.into();
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }
}

/// Merged reading across every provider that answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReading {
    pub name: String,
    pub lat: String,
    pub lon: String,
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub cloud_cover_pct: Option<u8>,
    pub weather_code: Option<i32>,
    pub description: String,
}

impl ConsensusReading {
    pub fn new(location: GeocodeResult, merged: Sample) -> Self {
        Self {
            name: location.name,
            lat: location.lat,
            lon: location.lon,
            temperature_c: merged.temperature_c,
            wind_speed_ms: merged.wind_speed_ms,
            precipitation_mm: merged.precipitation_mm,
            cloud_cover_pct: merged.cloud_cover_pct,
            weather_code: merged.weather_code,
            description: merged.description.unwrap_or_default(),
        }
    }
}
