//! Cache contract for consensus readings, plus in-memory and on-disk stores.
//!
//! Keys come from [`fingerprint`]; values are opaque strings (the orchestrator
//! stores JSON). Entries expire on their own and are never invalidated.

use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use crate::{error::WeatherError, provider::ProviderId};

const KEY_PREFIX: &str = "sv_vader_";

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub trait CacheStore: Send + Sync + Debug {
    /// Stored value for `key`, or `None` on a miss or an expired entry.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` for `ttl`. Later writes replace earlier ones.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WeatherError>;
}

/// Deterministic key for a query. Provider order does not affect the key.
pub fn fingerprint(place: &str, lat: &str, lon: &str, providers: &[ProviderId]) -> String {
    let mut ids: Vec<&str> = providers.iter().map(ProviderId::as_str).collect();
    ids.sort_unstable();
    ids.dedup();

    let material = serde_json::json!([place.trim(), lat.trim(), lon.trim(), ids]).to_string();
    format!("{KEY_PREFIX}{:x}", Sha256::digest(material.as_bytes()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    expires_at: DateTime<Utc>,
    value: String,
}

impl Entry {
    fn new(value: &str, ttl: Duration, now: DateTime<Utc>) -> Result<Self, WeatherError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| WeatherError::Cache(format!("invalid ttl: {e}")))?;
        Ok(Self { expires_at: now + ttl, value: value.to_string() })
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Process-local cache.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { entries: Mutex::new(HashMap::new()), clock }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WeatherError> {
        let entry = Entry::new(value, ttl, self.clock.now())?;
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }
}

/// One JSON file per key, so entries outlive the process.
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self { dir: dir.into(), clock }
    }

    /// Platform cache directory for this application.
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let dirs = ProjectDirs::from("se", "sv-vader", "vader")
            .context("Could not determine platform cache directory")?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        let contents = fs::read_to_string(&path).ok()?;

        let entry: Entry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Ignoring unreadable cache file {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.is_live(self.clock.now()) {
            Some(entry.value)
        } else {
            let _ = fs::remove_file(&path);
            None
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WeatherError> {
        let entry = Entry::new(value, ttl, self.clock.now())?;
        let json = serde_json::to_string(&entry).map_err(|e| WeatherError::Cache(e.to_string()))?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            WeatherError::Cache(format!("create {}: {e}", self.dir.display()))
        })?;

        let path = self.entry_path(key);
        fs::write(&path, json)
            .map_err(|e| WeatherError::Cache(format!("write {}: {e}", path.display())))
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()))
    }

    #[test]
    fn fingerprint_is_deterministic_and_order_insensitive() {
        let a = fingerprint("Göteborg", "", "", &[ProviderId::Smhi, ProviderId::OpenMeteo]);
        let b = fingerprint("Göteborg", "", "", &[ProviderId::OpenMeteo, ProviderId::Smhi]);
        assert_eq!(a, b);
        assert!(a.starts_with(KEY_PREFIX));
        assert_eq!(a.len(), KEY_PREFIX.len() + 64);
    }

    #[test]
    fn fingerprint_distinguishes_inputs() {
        let base = fingerprint("Oslo", "", "", &[ProviderId::MetNorway]);
        assert_ne!(base, fingerprint("Bergen", "", "", &[ProviderId::MetNorway]));
        assert_ne!(base, fingerprint("Oslo", "59.9", "10.7", &[ProviderId::MetNorway]));
        assert_ne!(base, fingerprint("Oslo", "", "", &[ProviderId::Smhi]));
        assert_eq!(base, fingerprint(" Oslo ", "", "", &[ProviderId::MetNorway]));
    }

    #[test]
    fn memory_cache_roundtrip_within_ttl() {
        let clock = clock();
        let cache = MemoryCache::with_clock(clock.clone());

        cache.set("k", r#"{"temp":1.5}"#, Duration::from_secs(600)).unwrap();
        clock.advance(Duration::from_secs(599));

        assert_eq!(cache.get("k").as_deref(), Some(r#"{"temp":1.5}"#));
    }

    #[test]
    fn memory_cache_expires_after_ttl() {
        let clock = clock();
        let cache = MemoryCache::with_clock(clock.clone());

        cache.set("k", "v", Duration::from_secs(60)).unwrap();
        clock.advance(Duration::from_secs(60));

        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn memory_cache_last_write_wins() {
        let cache = MemoryCache::with_clock(clock());
        cache.set("k", "first", Duration::from_secs(60)).unwrap();
        cache.set("k", "second", Duration::from_secs(60)).unwrap();

        assert_eq!(cache.get("k").as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn file_cache_roundtrip_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let cache = FileCache::with_clock(dir.path().join("nested"), clock.clone());

        cache.set("sv_vader_abc", "payload", Duration::from_secs(120)).unwrap();
        assert_eq!(cache.get("sv_vader_abc").as_deref(), Some("payload"));

        clock.advance(Duration::from_secs(121));
        assert_eq!(cache.get("sv_vader_abc"), None);
        assert!(!dir.path().join("nested/sv_vader_abc.json").exists());
    }

    #[test]
    fn file_cache_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();

        FileCache::with_clock(dir.path(), clock.clone())
            .set("key", "kept", Duration::from_secs(60))
            .unwrap();

        let reopened = FileCache::with_clock(dir.path(), clock);
        assert_eq!(reopened.get("key").as_deref(), Some("kept"));
    }

    #[test]
    fn file_cache_treats_garbage_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "not json").unwrap();

        let cache = FileCache::with_clock(dir.path(), clock());
        assert_eq!(cache.get("bad"), None);
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn file_cache_sanitises_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::with_clock(dir.path(), clock());

        cache.set("../escape", "v", Duration::from_secs(60)).unwrap();
        assert!(dir.path().join("___escape.json").exists());
        assert_eq!(cache.get("../escape").as_deref(), Some("v"));
    }
}
