use crate::{
    Config, Sample,
    provider::{met_norway::MetNorwayProvider, open_meteo::OpenMeteoProvider, smhi::SmhiProvider},
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod met_norway;
pub mod open_meteo;
pub mod smhi;

/// Product identifier sent in the User-Agent header.
pub const PRODUCT_USER_AGENT: &str = concat!("SV-Vader/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    #[serde(alias = "openmeteo")]
    OpenMeteo,
    Smhi,
    #[serde(alias = "yr", alias = "metno")]
    MetNorway,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "open-meteo",
            ProviderId::Smhi => "smhi",
            ProviderId::MetNorway => "met-norway",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenMeteo, ProviderId::Smhi, ProviderId::MetNorway]
    }

    /// Parses a comma-separated list such as `"smhi,yr,openmeteo"`.
    ///
    /// Unknown tokens are skipped with a warning and repeats keep their first
    /// position, so the result is an ordered set.
    pub fn parse_list(list: &str) -> Vec<ProviderId> {
        let mut ids = Vec::new();
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match ProviderId::try_from(token) {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(err) => tracing::warn!("{err}"),
            }
        }
        ids
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            "smhi" => Ok(ProviderId::Smhi),
            "met-norway" | "metno" | "yr" => Ok(ProviderId::MetNorway),
            _ => Err(anyhow!(
                "Unknown provider '{value}'. Supported providers: open-meteo, smhi, met-norway."
            )),
        }
    }
}

/// Per-call settings handed to every adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Contact e-mail or URL for the MET Norway User-Agent. May be empty.
    pub contact: String,
    /// Language code for providers that localise their response.
    pub language: String,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Current conditions at `lat`/`lon` (decimal degrees, passed through as
    /// text). Any failure, including timeouts and non-2xx responses, is `None`.
    async fn fetch(&self, lat: &str, lon: &str, options: &FetchOptions) -> Option<Sample>;
}

/// Ordered mapping from provider id to adapter.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<(ProviderId, Arc<dyn WeatherProvider>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three built-in adapters with the configured timeout.
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.timeout();
        Self::new()
            .with_provider(Arc::new(OpenMeteoProvider::new(timeout)))
            .with_provider(Arc::new(SmhiProvider::new(timeout)))
            .with_provider(Arc::new(MetNorwayProvider::new(timeout)))
    }

    pub fn with_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Adds `provider`, replacing any adapter already registered under its id.
    pub fn register(&mut self, provider: Arc<dyn WeatherProvider>) {
        let id = provider.id();
        match self.providers.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = provider,
            None => self.providers.push((id, provider)),
        }
    }

    pub fn get(&self, id: ProviderId) -> Option<&Arc<dyn WeatherProvider>> {
        self.providers.iter().find(|(existing, _)| *existing == id).map(|(_, p)| p)
    }

    pub fn ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|(id, _)| *id).collect()
    }
}

/// Logs an adapter failure and turns it into "no sample".
pub(crate) fn into_sample(id: ProviderId, result: anyhow::Result<Sample>) -> Option<Sample> {
    match result {
        Ok(sample) => Some(sample),
        Err(err) => {
            tracing::warn!(provider = %id, "fetch failed: {err:#}");
            None
        }
    }
}

/// Sends `request` and parses a JSON body, failing on non-2xx status.
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
) -> anyhow::Result<T> {
    let res = request
        .send()
        .await
        .with_context(|| format!("Failed to send request to {provider}"))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {provider} response body"))?;

    if !status.is_success() {
        return Err(anyhow!(
            "{provider} request failed with status {}: {}",
            status,
            truncate_body(&body),
        ));
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse {provider} JSON"))
}

/// Entry whose timestamp is closest to `now`. Ties go to the earliest entry in
/// the series; entries with unparseable timestamps are skipped.
pub(crate) fn nearest_to_now<T>(
    entries: &[T],
    now: DateTime<Utc>,
    time_of: impl Fn(&T) -> &str,
) -> Option<&T> {
    entries
        .iter()
        .filter_map(|entry| {
            let at = DateTime::parse_from_rfc3339(time_of(entry)).ok()?;
            Some((entry, (at.with_timezone(&Utc) - now).num_seconds().abs()))
        })
        .min_by_key(|(_, diff)| *diff)
        .map(|(entry, _)| entry)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
