//! Configuration resolution for songgraph-server
//!
//! Every setting resolves CLI → ENV → TOML → compiled default
//! (see [`songgraph_common::config::resolve`]).

use songgraph_common::config::{env_parsed, env_value, resolve, TomlConfig};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_WORKERS: usize = 8;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_JOB_TTL_SECS: u64 = 3600;
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const DEFAULT_LYRICS_API_BASE: &str = "https://api.lyrics.ovh";
pub const DEFAULT_LYRICS_REQUESTS_PER_SECOND: u32 = 4;
pub const DEFAULT_SENTIMENT_API_BASE: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_SENTIMENT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const DEFAULT_TEMPO_ANALYSIS_SECONDS: u32 = 30;

/// Origins allowed by CORS before `FRONTEND_URL` and TOML additions
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 5] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
    "https://*.vercel.app",
];

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub bind_address: Option<String>,
    pub bpm_max_workers: Option<usize>,
    pub sentiment_max_workers: Option<usize>,
}

/// Spotify Web API settings
#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: String,
    pub accounts_base: String,
}

/// Resolved server settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub log_level: String,
    /// Concurrent tempo resolutions across all jobs
    pub bpm_max_workers: usize,
    /// Concurrent sentiment resolutions across all jobs
    pub sentiment_max_workers: usize,
    /// Bound on each individual provider call
    pub provider_timeout: Duration,
    /// How long a terminal job stays queryable
    pub job_ttl: Duration,
    pub reaper_interval: Duration,
    pub allowed_origins: Vec<String>,
    pub spotify: SpotifySettings,
    pub lyrics_api_base: String,
    pub lyrics_requests_per_second: u32,
    pub sentiment_api_base: String,
    pub sentiment_model: String,
    pub sentiment_api_token: Option<String>,
    pub tempo_analysis_seconds: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            log_level: "info".to_string(),
            bpm_max_workers: DEFAULT_MAX_WORKERS,
            sentiment_max_workers: DEFAULT_MAX_WORKERS,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            spotify: SpotifySettings {
                client_id: None,
                client_secret: None,
                api_base: DEFAULT_SPOTIFY_API_BASE.to_string(),
                accounts_base: DEFAULT_SPOTIFY_ACCOUNTS_BASE.to_string(),
            },
            lyrics_api_base: DEFAULT_LYRICS_API_BASE.to_string(),
            lyrics_requests_per_second: DEFAULT_LYRICS_REQUESTS_PER_SECOND,
            sentiment_api_base: DEFAULT_SENTIMENT_API_BASE.to_string(),
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            sentiment_api_token: None,
            tempo_analysis_seconds: DEFAULT_TEMPO_ANALYSIS_SECONDS,
        }
    }
}

impl ServerSettings {
    /// Resolve settings from CLI overrides, environment and TOML
    pub fn resolve(cli: &ServerOverrides, toml: &TomlConfig) -> Self {
        let defaults = Self::default();
        let server = &toml.server;

        let bind_address = resolve(
            cli.bind_address.clone(),
            env_value("SONGGRAPH_BIND"),
            toml.bind_address.clone(),
            defaults.bind_address,
        );
        let bpm_max_workers = resolve(
            cli.bpm_max_workers,
            env_parsed("BPM_MAX_WORKERS"),
            server.bpm_max_workers,
            defaults.bpm_max_workers,
        )
        .max(1);
        let sentiment_max_workers = resolve(
            cli.sentiment_max_workers,
            env_parsed("SENTIMENT_MAX_WORKERS"),
            server.sentiment_max_workers,
            defaults.sentiment_max_workers,
        )
        .max(1);

        let mut allowed_origins = server
            .allowed_origins
            .clone()
            .unwrap_or(defaults.allowed_origins);
        if let Some(frontend) = env_value("FRONTEND_URL") {
            if !allowed_origins.contains(&frontend) {
                allowed_origins.push(frontend);
            }
        }

        let spotify = SpotifySettings {
            client_id: env_value("SPOTIFY_CLIENT_ID").or_else(|| toml.spotify.client_id.clone()),
            client_secret: env_value("SPOTIFY_CLIENT_SECRET")
                .or_else(|| toml.spotify.client_secret.clone()),
            api_base: toml
                .spotify
                .api_base
                .clone()
                .unwrap_or(defaults.spotify.api_base),
            accounts_base: toml
                .spotify
                .accounts_base
                .clone()
                .unwrap_or(defaults.spotify.accounts_base),
        };

        let settings = Self {
            bind_address,
            log_level: toml.logging.level.clone(),
            bpm_max_workers,
            sentiment_max_workers,
            provider_timeout: server
                .provider_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            job_ttl: server
                .job_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_ttl),
            reaper_interval: server
                .reaper_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.reaper_interval),
            allowed_origins,
            spotify,
            lyrics_api_base: toml.lyrics.api_base.clone().unwrap_or(defaults.lyrics_api_base),
            lyrics_requests_per_second: toml
                .lyrics
                .requests_per_second
                .unwrap_or(defaults.lyrics_requests_per_second)
                .max(1),
            sentiment_api_base: toml
                .sentiment
                .api_base
                .clone()
                .unwrap_or(defaults.sentiment_api_base),
            sentiment_model: toml
                .sentiment
                .model
                .clone()
                .unwrap_or(defaults.sentiment_model),
            sentiment_api_token: env_value("HF_API_TOKEN")
                .or_else(|| toml.sentiment.api_token.clone()),
            tempo_analysis_seconds: toml
                .tempo
                .analysis_seconds
                .unwrap_or(defaults.tempo_analysis_seconds),
        };

        info!(
            bpm_max_workers = settings.bpm_max_workers,
            sentiment_max_workers = settings.sentiment_max_workers,
            "Worker limits resolved"
        );
        settings
    }
}
