//! Errors surfaced by the geocoder and the weather orchestrator.
//!
//! Provider adapters never return these: a failed fetch is `None`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream service returned HTTP {status}")]
    Http { status: u16 },

    #[error("Unexpected response shape: {0}")]
    Parse(String),

    #[error("No place matched '{query}'")]
    NotFound { query: String },

    #[error("All weather sources failed")]
    NoSourcesAvailable,

    #[error("Neither a place name nor coordinates were given")]
    InvalidInput,

    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Kunde inte nå vädertjänsten.".to_string(),
            Self::Http { status } => format!("Fel från vädertjänst ({status})."),
            Self::Parse(_) => "Inga väderdata tillgängliga.".to_string(),
            Self::NotFound { .. } => "Kunde inte hitta platsen.".to_string(),
            Self::NoSourcesAvailable => "Ingen vädertjänst svarade.".to_string(),
            Self::InvalidInput => "Ingen ort eller koordinater angivna.".to_string(),
            Self::Cache(_) => "Lokalt cachefel.".to_string(),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Http { status: status.as_u16() }
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
