use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, str::FromStr, time::Duration};

use crate::provider::ProviderId;

pub const DEFAULT_PLACE: &str = "Stockholm";
pub const DEFAULT_CACHE_MINUTES: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 12;
pub const DEFAULT_CONTACT: &str = "kontakt@example.com";

/// A value the output can include. The description is always shown when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowField {
    Temp,
    Wind,
    Icon,
    Precip,
    Cloud,
}

impl ShowField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowField::Temp => "temp",
            ShowField::Wind => "wind",
            ShowField::Icon => "icon",
            ShowField::Precip => "precip",
            ShowField::Cloud => "cloud",
        }
    }

    pub const fn defaults() -> &'static [ShowField] {
        &[ShowField::Temp, ShowField::Wind, ShowField::Icon]
    }

    /// Parses `"temp, wind,icon"`. Unknown tokens are ignored, repeats keep
    /// their first position, and an empty result falls back to the defaults.
    pub fn parse_list(list: &str) -> Vec<ShowField> {
        let mut fields = Vec::new();
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Ok(field) = token.parse::<ShowField>() {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        if fields.is_empty() { Self::defaults().to_vec() } else { fields }
    }
}

impl fmt::Display for ShowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "temp" => Ok(ShowField::Temp),
            "wind" => Ok(ShowField::Wind),
            "icon" => Ok(ShowField::Icon),
            "precip" => Ok(ShowField::Precip),
            "cloud" => Ok(ShowField::Cloud),
            _ => Err(anyhow!("Unknown field '{s}'. Supported: temp, wind, icon, precip, cloud.")),
        }
    }
}

/// Operator settings stored on disk.
///
/// Example TOML:
/// ```toml
/// default_place = "Göteborg"
/// cache_minutes = 15
/// providers = ["smhi", "open-meteo", "met-norway"]
/// met_norway_contact = "ops@example.com"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_place: String,

    /// How long readings stay cached. Values below 1 are treated as 1.
    pub cache_minutes: u32,

    /// Language for geocoding and provider text.
    pub language: String,

    pub default_show: Vec<ShowField>,

    /// Enabled providers. Order sets which provider's weather code wins.
    pub providers: Vec<ProviderId>,

    /// Contact for the MET Norway User-Agent.
    pub met_norway_contact: String,

    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_place: DEFAULT_PLACE.to_string(),
            cache_minutes: DEFAULT_CACHE_MINUTES,
            language: "sv".to_string(),
            default_show: ShowField::defaults().to_vec(),
            providers: ProviderId::all().to_vec(),
            met_norway_contact: DEFAULT_CONTACT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(contents)?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let toml = toml::to_string_pretty(&normalized)
            .context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("se", "sv-vader", "vader")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Clamps values into their valid ranges and drops repeated entries.
    pub fn normalize(&mut self) {
        self.cache_minutes = self.cache_minutes.max(1);
        self.timeout_secs = self.timeout_secs.max(1);
        self.default_place = self.default_place.trim().to_string();
        self.met_norway_contact = self.met_norway_contact.trim().to_string();

        let mut seen: Vec<ProviderId> = Vec::with_capacity(self.providers.len());
        self.providers.retain(|id| {
            let first = !seen.contains(id);
            seen.push(*id);
            first
        });

        let mut seen: Vec<ShowField> = Vec::with_capacity(self.default_show.len());
        self.default_show.retain(|field| {
            let first = !seen.contains(field);
            seen.push(*field);
            first
        });
        if self.default_show.is_empty() {
            self.default_show = ShowField::defaults().to_vec();
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_minutes.max(1)) * 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn is_provider_enabled(&self, id: ProviderId) -> bool {
        self.providers.contains(&id)
    }

    pub fn set_provider_enabled(&mut self, id: ProviderId, enabled: bool) {
        if enabled {
            if !self.is_provider_enabled(id) {
                self.providers.push(id);
            }
        } else {
            self.providers.retain(|p| *p != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.default_place, "Stockholm");
        assert_eq!(cfg.cache_minutes, 10);
        assert_eq!(cfg.providers, ProviderId::all().to_vec());
        assert_eq!(cfg.default_show, vec![ShowField::Temp, ShowField::Wind, ShowField::Icon]);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn zero_cache_minutes_is_clamped_to_one() {
        let cfg = Config::from_toml("cache_minutes = 0").unwrap();
        assert_eq!(cfg.cache_minutes, 1);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(60));

        let unnormalized = Config { cache_minutes: 0, ..Config::default() };
        assert_eq!(unnormalized.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = Config::from_toml(
            r#"
            default_place = "Göteborg"
            providers = ["yr", "smhi", "smhi"]
            met_norway_contact = "  ops@example.com "
            "#,
        )
        .unwrap();

        assert_eq!(cfg.default_place, "Göteborg");
        assert_eq!(cfg.providers, vec![ProviderId::MetNorway, ProviderId::Smhi]);
        assert_eq!(cfg.met_norway_contact, "ops@example.com");
        assert_eq!(cfg.language, "sv");
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn unknown_provider_in_toml_is_an_error() {
        assert!(Config::from_toml(r#"providers = ["accuweather"]"#).is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.set_provider_enabled(ProviderId::OpenMeteo, false);
        cfg.default_show = vec![ShowField::Precip];

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();

        assert_eq!(back.providers, vec![ProviderId::Smhi, ProviderId::MetNorway]);
        assert_eq!(back.default_show, vec![ShowField::Precip]);
    }

    #[test]
    fn enabling_provider_appends_once() {
        let mut cfg = Config { providers: vec![], ..Config::default() };
        cfg.set_provider_enabled(ProviderId::Smhi, true);
        cfg.set_provider_enabled(ProviderId::Smhi, true);
        assert_eq!(cfg.providers, vec![ProviderId::Smhi]);
        assert!(!cfg.is_provider_enabled(ProviderId::OpenMeteo));
    }

    #[test]
    fn show_fields_parse_ignores_unknown_and_repeats() {
        assert_eq!(
            ShowField::parse_list("WIND, temp,bogus,wind"),
            vec![ShowField::Wind, ShowField::Temp]
        );
    }

    #[test]
    fn show_fields_fall_back_to_defaults() {
        assert_eq!(ShowField::parse_list(""), ShowField::defaults().to_vec());
        assert_eq!(ShowField::parse_list("nope, ,"), ShowField::defaults().to_vec());
    }
}
