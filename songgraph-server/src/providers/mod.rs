//! External collaborators: playlist lookup, tempo, lyrics, sentiment
//!
//! The enrichment pipeline only sees the traits in this module; the
//! concrete reqwest-backed clients live in the submodules.

mod audio;
pub mod lyrics;
pub mod sentiment;
pub mod spotify;
pub mod tempo;

pub use lyrics::LyricsApiClient;
pub use sentiment::HuggingFaceSentiment;
pub use spotify::SpotifyClient;
pub use tempo::PreviewTempoAnalyzer;

use crate::config::ServerSettings;
use async_trait::async_trait;
use songgraph_common::{PlaylistMetadata, SentimentBreakdown, Track};
use std::sync::Arc;
use thiserror::Error;

pub const USER_AGENT: &str = concat!("songgraph/", env!("CARGO_PKG_VERSION"));

/// Provider errors
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Api(status.as_u16(), err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Playlist metadata and track listing
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn metadata(&self, playlist_url: &str) -> Result<PlaylistMetadata, ProviderError>;

    /// Tracks in playlist order plus the playlist name
    async fn tracks(&self, playlist_url: &str) -> Result<(Vec<Track>, String), ProviderError>;
}

/// Tempo (BPM) of one track; `Ok(None)` when no tempo could be determined
#[async_trait]
pub trait TempoProvider: Send + Sync {
    async fn tempo(&self, track: &Track) -> Result<Option<f64>, ProviderError>;
}

/// Preview clip lookup for tracks listed without one
#[async_trait]
pub trait PreviewFinder: Send + Sync {
    async fn find_preview(&self, track: &Track) -> Result<Option<String>, ProviderError>;
}

/// Lyrics of one track; `Ok(None)` when none are known
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    async fn lyrics(&self, track: &Track) -> Result<Option<String>, ProviderError>;
}

/// Scored lyrics: track valence plus the stanza scores it averages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricSentiment {
    /// Valence in [0, 1]; `None` when nothing could be scored
    pub score: Option<f64>,
    pub breakdown: SentimentBreakdown,
}

impl LyricSentiment {
    /// Score of lyrics that form one stanza
    pub fn single(score: f64) -> Self {
        Self {
            score: Some(score),
            breakdown: SentimentBreakdown {
                chunks: 1,
                stanza_scores: vec![score],
            },
        }
    }
}

/// Lyric valence in [0, 1]
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Called once per job before any scoring
    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn score(&self, lyrics: &str) -> Result<LyricSentiment, ProviderError>;
}

/// Provider set used by the server
#[derive(Clone)]
pub struct Providers {
    pub playlists: Arc<dyn PlaylistSource>,
    pub tempo: Arc<dyn TempoProvider>,
    pub lyrics: Arc<dyn LyricsProvider>,
    pub sentiment: Arc<dyn SentimentModel>,
}

impl Providers {
    /// Network-backed providers configured from settings
    pub fn from_settings(settings: &ServerSettings) -> Result<Self, ProviderError> {
        let spotify = Arc::new(SpotifyClient::new(settings.spotify.clone())?);
        Ok(Self {
            playlists: spotify.clone(),
            tempo: Arc::new(PreviewTempoAnalyzer::new(
                settings.tempo_analysis_seconds,
                Some(spotify),
            )?),
            lyrics: Arc::new(LyricsApiClient::new(
                &settings.lyrics_api_base,
                settings.lyrics_requests_per_second,
            )?),
            sentiment: Arc::new(HuggingFaceSentiment::new(
                &settings.sentiment_api_base,
                &settings.sentiment_model,
                settings.sentiment_api_token.clone(),
            )?),
        })
    }
}

/// Build a reqwest client with the service user agent
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(5))
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// Map a non-success response to a provider error, keeping a short body excerpt
pub(crate) async fn error_for_status(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(200).collect();
    ProviderError::Api(status, excerpt)
}
