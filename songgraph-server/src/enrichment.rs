//! Track Enrichment Unit
//!
//! Resolves the two enrichment dimensions of one track independently.
//! Each provider call is made exactly once, bounded by a timeout, and a
//! panicking provider is contained to the (track, dimension) it was
//! working on.

use crate::providers::{
    LyricSentiment, LyricsProvider, ProviderError, SentimentModel, TempoProvider,
};
use futures::FutureExt;
use songgraph_common::Track;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a per-track failure message, in characters
pub const MAX_FAILURE_MESSAGE_CHARS: usize = 200;

/// Per-(track, dimension) enrichment failure
#[derive(Debug, Clone, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("lyrics not found")]
    LyricsNotFound,

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("provider panicked")]
    Panicked,
}

impl EnrichmentError {
    /// Message recorded on the failed cell
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.chars().count() <= MAX_FAILURE_MESSAGE_CHARS {
            return message;
        }
        let mut truncated: String = message.chars().take(MAX_FAILURE_MESSAGE_CHARS - 3).collect();
        truncated.push_str("...");
        truncated
    }
}

/// Resolves tempo and sentiment for single tracks
pub struct EnrichmentUnit {
    tempo: Arc<dyn TempoProvider>,
    lyrics: Arc<dyn LyricsProvider>,
    sentiment: Arc<dyn SentimentModel>,
    timeout: Duration,
}

impl EnrichmentUnit {
    pub fn new(
        tempo: Arc<dyn TempoProvider>,
        lyrics: Arc<dyn LyricsProvider>,
        sentiment: Arc<dyn SentimentModel>,
        timeout: Duration,
    ) -> Self {
        Self {
            tempo,
            lyrics,
            sentiment,
            timeout,
        }
    }

    /// Job-level setup: make sure the sentiment model can be used
    pub async fn ready(&self) -> Result<(), EnrichmentError> {
        guarded(self.timeout, self.sentiment.ensure_ready()).await
    }

    /// Tempo in BPM; `Ok(None)` when the provider had no answer
    pub async fn resolve_tempo(&self, track: &Track) -> Result<Option<f64>, EnrichmentError> {
        guarded(self.timeout, self.tempo.tempo(track)).await
    }

    /// Lyric valence; `on_lyrics` runs once lyrics have been fetched
    pub async fn resolve_sentiment<F>(
        &self,
        track: &Track,
        on_lyrics: F,
    ) -> Result<LyricSentiment, EnrichmentError>
    where
        F: FnOnce() + Send,
    {
        let lyrics = guarded(self.timeout, self.lyrics.lyrics(track))
            .await?
            .filter(|l| !l.trim().is_empty())
            .ok_or(EnrichmentError::LyricsNotFound)?;
        on_lyrics();
        guarded(self.timeout, self.sentiment.score(&lyrics)).await
    }
}

async fn guarded<T, F>(timeout: Duration, call: F) -> Result<T, EnrichmentError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(call).catch_unwind()).await {
        Err(_) => Err(EnrichmentError::Timeout(timeout.as_secs())),
        Ok(Err(_)) => Err(EnrichmentError::Panicked),
        Ok(Ok(result)) => result.map_err(EnrichmentError::from),
    }
}
