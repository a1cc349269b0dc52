//! Reduces several provider samples into one reading.
//!
//! Numbers take the lower median per field. The weather code comes from the
//! first sample (in provider order) that has one; otherwise the description
//! is derived from precipitation and cloud cover.

use crate::{model::Sample, wmo::wmo_text_sv};

const PRECIPITATION_THRESHOLD_MM: f64 = 0.1;

/// Merges `samples` into one. Returns `None` for an empty slice; callers are
/// expected to check for that first.
pub fn reduce(samples: &[Sample]) -> Option<Sample> {
    if samples.is_empty() {
        return None;
    }

    let mut merged = Sample {
        temperature_c: lower_median(samples.iter().filter_map(|s| s.temperature_c)),
        wind_speed_ms: lower_median(samples.iter().filter_map(|s| s.wind_speed_ms)),
        precipitation_mm: lower_median(samples.iter().filter_map(|s| s.precipitation_mm)),
        cloud_cover_pct: lower_median(samples.iter().filter_map(|s| s.cloud_cover_pct)),
        weather_code: None,
        description: None,
    };

    let description = match samples.iter().find_map(|s| s.weather_code) {
        Some(code) => {
            merged.weather_code = Some(code);
            wmo_text_sv(code)
        }
        None => describe_without_code(merged.precipitation_mm, merged.cloud_cover_pct),
    };
    merged.description = Some(description.to_string());

    Some(merged)
}

fn describe_without_code(precipitation_mm: Option<f64>, cloud_cover_pct: Option<u8>) -> &'static str {
    if precipitation_mm.is_some_and(|mm| mm >= PRECIPITATION_THRESHOLD_MM) {
        return "Nederbörd";
    }
    match cloud_cover_pct {
        Some(pct) if pct <= 20 => "Klart",
        Some(pct) if pct <= 60 => "Växlande molnighet",
        Some(_) => "Mulet",
        None => "",
    }
}

/// Element at index `(n - 1) / 2` after sorting; for even counts this is the
/// lower of the two middle values.
fn lower_median<T, I>(values: I) -> Option<T>
where
    T: PartialOrd + Copy,
    I: Iterator<Item = T>,
{
    let mut values: Vec<T> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(values[(values.len() - 1) / 2])
}
