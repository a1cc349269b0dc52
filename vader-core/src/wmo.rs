//! WMO weather codes: Swedish condition text and icon buckets.
//! See: https://open-meteo.com/en/docs#weathervariables

use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/erikflowers/weather-icons/svg";

/// Swedish description for a WMO code, or `""` when the code is unknown.
pub fn wmo_text_sv(code: i32) -> &'static str {
    match code {
        0 => "Klart",
        1 => "Mest klart",
        2 => "Växlande molnighet",
        3 => "Mulet",
        45 => "Dimma",
        48 => "Dimfrost",
        51 => "Duggregn svagt",
        53 => "Duggregn måttligt",
        55 => "Duggregn kraftigt",
        61 => "Regn svagt",
        63 => "Regn måttligt",
        65 => "Regn kraftigt",
        66 => "Underkylt regn svagt",
        67 => "Underkylt regn kraftigt",
        71 => "Snöfall svagt",
        73 => "Snöfall måttligt",
        75 => "Snöfall kraftigt",
        77 => "Kornsnö",
        80 => "Skurar svaga",
        81 => "Skurar måttliga",
        82 => "Skurar kraftiga",
        85 => "Snöbyar svaga",
        86 => "Snöbyar kraftiga",
        95 => "Åska",
        96 => "Åska (svag hagel)",
        99 => "Åska (kraftig hagel)",
        _ => "",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconSlug {
    ClearDay,
    Cloudy,
    Rain,
    Snow,
    Thunderstorms,
}

impl IconSlug {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClearDay => "clear-day",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Thunderstorms => "thunderstorms",
        }
    }

    /// SVG from the Weather Icons set.
    pub fn url(&self) -> String {
        format!("{ICON_BASE_URL}/wi-{}.svg", self.as_str())
    }
}

impl std::fmt::Display for IconSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Icon bucket for a WMO code. Codes outside the known families get no icon.
pub fn code_to_icon_slug(code: Option<i32>) -> Option<IconSlug> {
    match code? {
        0 | 1 => Some(IconSlug::ClearDay),
        2 | 3 | 45 | 48 => Some(IconSlug::Cloudy),
        51 | 53 | 55 | 61 | 63 | 65 | 80 | 81 | 82 => Some(IconSlug::Rain),
        71 | 73 | 75 | 77 | 85 | 86 => Some(IconSlug::Snow),
        95 | 96 | 99 => Some(IconSlug::Thunderstorms),
        _ => None,
    }
}
