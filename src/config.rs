use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::{DiscoveryOptions, RadiusBounds};
use crate::models::{Coordinate, CoordinateError, FeedKind};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub location: LocationSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub feeds: FeedPaths,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Search backend the feeds query
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(15))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationSettings {
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,
    #[serde(default = "default_location_timeout")]
    pub timeout_secs: u64,
    /// IP geolocation endpoint with an `{ip}` placeholder, used when the client
    /// sends no position
    pub provider_url: Option<String>,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
            timeout_secs: default_location_timeout(),
            provider_url: None,
        }
    }
}

impl LocationSettings {
    pub fn fallback(&self) -> Result<Coordinate, CoordinateError> {
        Coordinate::new(self.fallback_latitude, self.fallback_longitude)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_fallback_latitude() -> f64 { 20.5937 }
fn default_fallback_longitude() -> f64 { 78.9629 }
fn default_location_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_radius")]
    pub default_radius_meters: u32,
    #[serde(default = "default_min_radius")]
    pub min_radius_meters: u32,
    #[serde(default = "default_max_radius")]
    pub max_radius_meters: u32,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_radius_meters: default_radius(),
            min_radius_meters: default_min_radius(),
            max_radius_meters: default_max_radius(),
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle(),
        }
    }
}

impl DiscoverySettings {
    pub fn options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            page_size: self.page_size,
            default_radius_meters: self.default_radius_meters,
            radius_bounds: RadiusBounds {
                min: self.min_radius_meters,
                max: self.max_radius_meters.max(self.min_radius_meters),
            },
        }
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

fn default_page_size() -> u32 { 20 }
fn default_radius() -> u32 { 5_000 }
fn default_min_radius() -> u32 { 100 }
fn default_max_radius() -> u32 { 100_000 }
fn default_max_sessions() -> u64 { 10_000 }
fn default_session_idle() -> u64 { 1_800 }

/// Backend path for each feed, relative to `backend.base_url`
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPaths {
    #[serde(default = "default_travelers_path")]
    pub travelers: String,
    #[serde(default = "default_hotels_path")]
    pub hotels: String,
    #[serde(default = "default_attractions_path")]
    pub attractions: String,
    #[serde(default = "default_shopping_path")]
    pub shopping: String,
    #[serde(default = "default_emergency_path")]
    pub emergency: String,
    #[serde(default = "default_activities_path")]
    pub activities: String,
}

impl Default for FeedPaths {
    fn default() -> Self {
        Self {
            travelers: default_travelers_path(),
            hotels: default_hotels_path(),
            attractions: default_attractions_path(),
            shopping: default_shopping_path(),
            emergency: default_emergency_path(),
            activities: default_activities_path(),
        }
    }
}

impl FeedPaths {
    pub fn path(&self, feed: FeedKind) -> &str {
        match feed {
            FeedKind::Travelers => &self.travelers,
            FeedKind::Hotels => &self.hotels,
            FeedKind::Attractions => &self.attractions,
            FeedKind::Shopping => &self.shopping,
            FeedKind::Emergency => &self.emergency,
            FeedKind::Activities => &self.activities,
        }
    }
}

fn default_travelers_path() -> String { "travelers/search".to_string() }
fn default_hotels_path() -> String { "places/hotels".to_string() }
fn default_attractions_path() -> String { "places/attractions".to_string() }
fn default_shopping_path() -> String { "places/shopping".to_string() }
fn default_emergency_path() -> String { "places/emergency".to_string() }
fn default_activities_path() -> String { "activities/search".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ROAM__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ROAM__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("ROAM")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply the conventional unprefixed variables deployments already set
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("SEARCH_API_URL") {
        builder = builder.set_override("backend.base_url", url)?;
    }
    if let Ok(key) = env::var("SEARCH_API_KEY") {
        builder = builder.set_override("backend.api_key", key)?;
    }

    builder.build()
}
