//! Core library for the `vader` weather tool.
//!
//! This crate defines:
//! - Provider adapters for Open-Meteo, SMHI and MET Norway
//! - Forward geocoding of place names
//! - The consensus reducer that merges provider samples
//! - A cache contract with in-memory and on-disk stores
//! - Configuration handling and the `WeatherService` orchestrator
//!
//! It is used by `vader-cli`, but can also be embedded in other front ends.

pub mod cache;
pub mod config;
pub mod consensus;
pub mod error;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod service;
pub mod wmo;

pub use cache::{CacheStore, Clock, FileCache, MemoryCache, SystemClock, fingerprint};
pub use config::{Config, ShowField};
pub use consensus::reduce;
pub use error::WeatherError;
pub use geocode::Geocoder;
pub use model::{ConsensusReading, GeocodeResult, Sample, WeatherQuery};
pub use provider::{FetchOptions, ProviderId, ProviderRegistry, WeatherProvider};
pub use service::WeatherService;
pub use wmo::{IconSlug, code_to_icon_slug, wmo_text_sv};
