//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: defaults are used and a warning is
//! logged. A malformed TOML file is a configuration error.
//!
//! Binaries load configuration before logging is set up (the file names the
//! log level), so [`TomlConfig::load_resolved`] hands back a [`ConfigSource`]
//! to be logged once the subscriber is installed.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "SONGGRAPH_CONFIG";

/// Logging section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bpm_max_workers: Option<usize>,
    pub sentiment_max_workers: Option<usize>,
    pub provider_timeout_secs: Option<u64>,
    pub job_ttl_secs: Option<u64>,
    pub reaper_interval_secs: Option<u64>,
    pub allowed_origins: Option<Vec<String>>,
}

/// `[spotify]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifySection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: Option<String>,
    pub accounts_base: Option<String>,
}

/// `[lyrics]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsSection {
    pub api_base: Option<String>,
    pub requests_per_second: Option<u32>,
}

/// `[sentiment]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSection {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub api_token: Option<String>,
}

/// `[tempo]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoSection {
    /// Seconds of preview audio analysed per track
    pub analysis_seconds: Option<u32>,
}

/// `[client]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub server_url: Option<String>,
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub logging: LoggingConfig,
    pub server: ServerSection,
    pub spotify: SpotifySection,
    pub lyrics: LyricsSection,
    pub sentiment: SentimentSection,
    pub tempo: TempoSection,
    pub client: ClientSection,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from a file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        let (config, source) = Self::read(path)?;
        source.log();
        Ok(config)
    }

    /// Resolve the config file location and load it without logging
    pub fn load_resolved(cli_path: Option<&str>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::read(&path),
            None => Ok((Self::default(), ConfigSource::NoConfigDir)),
        }
    }

    fn read(path: &Path) -> Result<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Missing(path.to_path_buf())));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::parse(&content)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Resolved path does not exist; defaults in use
    Missing(PathBuf),
    /// No platform config directory; defaults in use
    NoConfigDir,
}

impl ConfigSource {
    pub fn is_default(&self) -> bool {
        !matches!(self, ConfigSource::File(_))
    }

    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => {
                warn!("Config file {} not found, using defaults", path.display())
            }
            ConfigSource::NoConfigDir => warn!("No config directory available, using defaults"),
        }
    }
}

/// Config file location: CLI argument → `SONGGRAPH_CONFIG` → platform config dir
pub fn resolve_config_path(cli_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(PathBuf::from(path));
    }
    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("songgraph").join("config.toml"))
}

/// Non-empty environment variable value
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Environment variable parsed into `T`; unparsable values are ignored with a warning
pub fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_value(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable value for {}: {:?}", name, raw);
            None
        }
    }
}

/// First available value in priority order: CLI → ENV → TOML → default
pub fn resolve<T>(cli: Option<T>, env: Option<T>, toml: Option<T>, default: T) -> T {
    cli.or(env).or(toml).unwrap_or(default)
}
