use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{CustomType, MultiSelect, Text};
use std::sync::Arc;
use vader_core::{
    CacheStore, Config, ConsensusReading, FileCache, MemoryCache, ProviderId, ShowField,
    WeatherQuery, WeatherService, code_to_icon_slug,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "vader", version, about = "Current weather as a consensus of several services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Edit default place, providers, MET Norway contact and cache time.
    Configure,

    /// Print the path of the config file.
    ConfigPath,

    /// Show current weather for a place or coordinates.
    Show {
        /// Place name, e.g. "Göteborg". Defaults to the configured place.
        place: Option<String>,

        /// Latitude in decimal degrees; skips geocoding together with --lon.
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,

        /// Longitude in decimal degrees.
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,

        /// Comma-separated providers in priority order, e.g. "smhi,yr,openmeteo".
        #[arg(long)]
        providers: Option<String>,

        /// Comma-separated fields: temp, wind, icon, precip, cloud.
        #[arg(long)]
        show: Option<String>,

        /// Contact for the MET Norway User-Agent; overrides the config.
        #[arg(long)]
        contact: Option<String>,

        /// Print the reading as JSON.
        #[arg(long)]
        json: bool,

        /// Bypass the on-disk cache.
        #[arg(long)]
        no_cache: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
            Command::Show { place, lat, lon, providers, show, contact, json, no_cache } => {
                let config = Config::load()?;
                let query = build_query(&config, place, lat, lon, providers.as_deref(), contact);
                let fields = match show {
                    Some(list) => ShowField::parse_list(&list),
                    None => config.default_show.clone(),
                };

                let cache: Arc<dyn CacheStore> = if no_cache {
                    Arc::new(MemoryCache::new())
                } else {
                    Arc::new(FileCache::new(FileCache::default_dir()?))
                };
                let service = WeatherService::from_config(&config, cache);

                let reading = service.current_weather(&query).await.map_err(|err| {
                    tracing::debug!("weather lookup failed: {err}");
                    anyhow!(err.user_message())
                })?;

                if json {
                    let out = serde_json::to_string_pretty(&reading)
                        .context("Failed to serialize reading")?;
                    println!("{out}");
                } else {
                    print!("{}", render(&reading, &fields));
                }
                Ok(())
            }
        }
    }
}

fn build_query(
    config: &Config,
    place: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    providers: Option<&str>,
    contact: Option<String>,
) -> WeatherQuery {
    let lat = lat.unwrap_or_default();
    let lon = lon.unwrap_or_default();
    let has_coordinates = !lat.trim().is_empty() && !lon.trim().is_empty();

    let place = match place {
        Some(p) => p,
        None if has_coordinates => String::new(),
        None => config.default_place.clone(),
    };

    WeatherQuery {
        place,
        lat,
        lon,
        providers: providers
            .map(ProviderId::parse_list)
            .unwrap_or_else(|| config.providers.clone()),
        contact: contact.unwrap_or_else(|| config.met_norway_contact.clone()),
    }
}

/// Plain-text rendering of a reading, one item per line.
fn render(reading: &ConsensusReading, fields: &[ShowField]) -> String {
    let mut out = String::new();
    let shows = |field| fields.contains(&field);

    if !reading.name.is_empty() {
        out.push_str(&format!("{}\n", reading.name));
    }
    if shows(ShowField::Icon) {
        if let Some(icon) = code_to_icon_slug(reading.weather_code) {
            out.push_str(&format!("{}\n", icon.url()));
        }
    }
    if let (true, Some(t)) = (shows(ShowField::Temp), reading.temperature_c) {
        out.push_str(&format!("{}°C\n", t.round() as i64));
    }
    if let (true, Some(w)) = (shows(ShowField::Wind), reading.wind_speed_ms) {
        out.push_str(&format!("Vind: {} m/s\n", w.round() as i64));
    }
    if let (true, Some(p)) = (shows(ShowField::Precip), reading.precipitation_mm) {
        out.push_str(&format!("Nederbörd: {p:.1} mm\n"));
    }
    if let (true, Some(c)) = (shows(ShowField::Cloud), reading.cloud_cover_pct) {
        out.push_str(&format!("Molnighet: {c} %\n"));
    }
    if !reading.description.is_empty() {
        out.push_str(&format!("{}\n", reading.description));
    }
    out
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let place = Text::new("Default place:")
        .with_default(&config.default_place)
        .prompt()?;
    config.default_place = place;

    // Enabled providers first, in their current priority order.
    let mut options = config.providers.clone();
    options.extend(ProviderId::all().iter().filter(|id| !config.providers.contains(*id)));
    let enabled: Vec<usize> = (0..config.providers.len()).collect();
    config.providers = MultiSelect::new("Providers (listed in priority order):", options)
        .with_default(&enabled)
        .prompt()?;

    let contact = Text::new("MET Norway contact (e-mail or URL):")
        .with_default(&config.met_norway_contact)
        .prompt()?;
    config.met_norway_contact = contact;

    config.cache_minutes = CustomType::<u32>::new("Cache time in minutes:")
        .with_default(config.cache_minutes)
        .with_error_message("Please type a whole number")
        .prompt()?;

    config.save()?;
    println!("Saved {}", Config::config_file_path()?.display());
    Ok(())
}
