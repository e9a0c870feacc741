//! Lyrics lookup against a lyrics.ovh-compatible API
//!
//! `GET {base}/v1/{artist}/{title}` → `{"lyrics": "..."}`; 404 means no
//! lyrics are known for the track.

use super::{error_for_status, http_client, LyricsProvider, ProviderError};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Url;
use serde::Deserialize;
use songgraph_common::Track;
use std::num::NonZeroU32;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    #[serde(default)]
    lyrics: Option<String>,
}

/// Lyrics API client
pub struct LyricsApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    /// Shared across all jobs so parallel workers respect the API's limits
    rate_limiter: DefaultDirectRateLimiter,
}

impl LyricsApiClient {
    pub fn new(base_url: &str, requests_per_second: u32) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::InvalidInput(format!("Bad lyrics API URL: {}", e)))?;
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client: http_client(15)?,
            base_url,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn lookup_url(&self, artist: &str, title: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidInput("Lyrics API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("v1")
            .push(artist)
            .push(title);
        Ok(url)
    }
}

#[async_trait]
impl LyricsProvider for LyricsApiClient {
    async fn lyrics(&self, track: &Track) -> Result<Option<String>, ProviderError> {
        let title = track.title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let artist = track.primary_artist().unwrap_or_default().trim();
        let url = self.lookup_url(artist, title)?;

        self.rate_limiter.until_ready().await;
        debug!(track_id = %track.track_id, "Fetching lyrics");

        let response = self.http_client.get(url).send().await?;
        match response.status().as_u16() {
            404 => return Ok(None),
            200..=299 => {}
            _ => return Err(error_for_status(response).await),
        }

        let body: LyricsResponse = response.json().await?;
        Ok(body.lyrics.as_deref().and_then(clean_lyrics))
    }
}

/// Trim and drop the trailing "…Embed" marker some sources append
pub fn clean_lyrics(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_suffix("Embed") {
        text = stripped.trim_end_matches(|c: char| c.is_ascii_digit()).trim_end();
    }
    (!text.is_empty()).then(|| text.to_string())
}
