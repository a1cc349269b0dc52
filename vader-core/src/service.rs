//! Top-level entry point: cache lookup, geocoding, provider fan-out,
//! consensus and cache write.

use futures::future::join_all;
use std::{sync::Arc, time::Duration};

use crate::{
    Config,
    cache::{CacheStore, fingerprint},
    consensus,
    error::WeatherError,
    geocode::Geocoder,
    model::{ConsensusReading, GeocodeResult, Sample, WeatherQuery},
    provider::{FetchOptions, ProviderId, ProviderRegistry, WeatherProvider},
};

#[derive(Debug, Clone)]
pub struct WeatherService {
    registry: ProviderRegistry,
    geocoder: Geocoder,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    language: String,
}

impl WeatherService {
    pub fn new(
        registry: ProviderRegistry,
        geocoder: Geocoder,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            registry,
            geocoder,
            cache,
            ttl: ttl.max(Duration::from_secs(60)),
            language: "sv".to_string(),
        }
    }

    /// Service wired with the built-in adapters and settings from `config`.
    pub fn from_config(config: &Config, cache: Arc<dyn CacheStore>) -> Self {
        let geocoder = Geocoder::new(config.language.clone()).with_timeout(config.timeout());
        Self::new(ProviderRegistry::from_config(config), geocoder, cache, config.cache_ttl())
            .with_language(config.language.clone())
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Current consensus weather for `query`.
    ///
    /// A cached reading is returned as stored. Otherwise the location is
    /// resolved, every selected provider is asked concurrently and the samples
    /// are merged in provider order.
    pub async fn current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<ConsensusReading, WeatherError> {
        let place = query.place.trim();
        let lat = query.lat.trim();
        let lon = query.lon.trim();

        if place.is_empty() && (lat.is_empty() || lon.is_empty()) {
            return Err(WeatherError::InvalidInput);
        }

        let key = fingerprint(place, lat, lon, &query.providers);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let location = if lat.is_empty() || lon.is_empty() {
            self.geocoder.resolve(place).await?
        } else {
            GeocodeResult { lat: lat.to_string(), lon: lon.to_string(), name: place.to_string() }
        };

        let samples = self.collect_samples(query, &location).await;
        if samples.is_empty() {
            return Err(WeatherError::NoSourcesAvailable);
        }
        let merged = consensus::reduce(&samples).ok_or(WeatherError::NoSourcesAvailable)?;
        let reading = ConsensusReading::new(location, merged);

        self.store(&key, &reading);
        Ok(reading)
    }

    fn cached(&self, key: &str) -> Option<ConsensusReading> {
        let raw = self.cache.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(reading) => {
                tracing::debug!(key, "cache hit");
                Some(reading)
            }
            Err(e) => {
                tracing::warn!(key, "discarding unreadable cache entry: {e}");
                None
            }
        }
    }

    fn store(&self, key: &str, reading: &ConsensusReading) {
        let result = serde_json::to_string(reading)
            .map_err(|e| WeatherError::Cache(e.to_string()))
            .and_then(|json| self.cache.set(key, &json, self.ttl));

        if let Err(e) = result {
            tracing::warn!(key, "failed to cache reading: {e}");
        }
    }

    /// Samples from every selected provider that answered, in `query.providers`
    /// order regardless of which replied first.
    async fn collect_samples(&self, query: &WeatherQuery, location: &GeocodeResult) -> Vec<Sample> {
        let options =
            FetchOptions { contact: query.contact.clone(), language: self.language.clone() };

        let mut selected: Vec<(ProviderId, Arc<dyn WeatherProvider>)> =
            Vec::with_capacity(query.providers.len());
        for id in &query.providers {
            if selected.iter().any(|(seen, _)| seen == id) {
                continue;
            }
            match self.registry.get(*id) {
                Some(provider) => selected.push((*id, provider.clone())),
                None => tracing::warn!(provider = %id, "no adapter registered"),
            }
        }

        let fetches = selected.iter().map(|(_, provider)| {
            provider.fetch(&location.lat, &location.lon, &options)
        });
        let results = join_all(fetches).await;

        let samples: Vec<Sample> = results.into_iter().flatten().collect();
        tracing::debug!(
            requested = selected.len(),
            answered = samples.len(),
            "provider fan-out finished"
        );
        samples
    }
}
