//! Tempo estimation from track preview clips
//!
//! Tracks listed without a preview URL are looked up through a
//! [`PreviewFinder`] first.
//!
//! **Algorithm:**
//! 1. Download the 30 s preview and decode it to mono (blocking pool)
//! 2. RMS energy per frame (1024 samples, hop 512)
//! 3. Onset strength: half-wave rectified energy difference, lightly smoothed
//! 4. Autocorrelation over lags covering 60–200 BPM, weighted by a
//!    log-normal tempo prior centred on 120 BPM to avoid octave errors
//! 5. Parabolic interpolation around the best lag

use super::audio::decode_mono;
use super::{error_for_status, http_client, PreviewFinder, ProviderError, TempoProvider};
use async_trait::async_trait;
use songgraph_common::Track;
use std::sync::Arc;
use tracing::debug;

const FRAME_SIZE: usize = 1024;
const HOP_SIZE: usize = 512;
const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;
const PRIOR_CENTER_BPM: f64 = 120.0;
/// Prior width in octaves
const PRIOR_WIDTH: f64 = 1.0;

/// Tempo provider that analyses the track's preview audio
pub struct PreviewTempoAnalyzer {
    http_client: reqwest::Client,
    analysis_seconds: u32,
    previews: Option<Arc<dyn PreviewFinder>>,
}

impl PreviewTempoAnalyzer {
    pub fn new(
        analysis_seconds: u32,
        previews: Option<Arc<dyn PreviewFinder>>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(20)?,
            analysis_seconds: analysis_seconds.max(5),
            previews,
        })
    }

    /// Listed preview URL, else the finder's answer.
    ///
    /// Finder failures are not fatal; the track then has no preview.
    async fn preview_url(&self, track: &Track) -> Result<String, ProviderError> {
        if let Some(url) = track.preview_url.as_deref().filter(|url| !url.is_empty()) {
            return Ok(url.to_string());
        }

        if let Some(finder) = &self.previews {
            match finder.find_preview(track).await {
                Ok(Some(url)) if !url.is_empty() => return Ok(url),
                Ok(_) => {}
                Err(e) => debug!(track_id = %track.track_id, "Preview search failed: {}", e),
            }
        }
        Err(ProviderError::NotFound("No preview URL available".to_string()))
    }
}

#[async_trait]
impl TempoProvider for PreviewTempoAnalyzer {
    async fn tempo(&self, track: &Track) -> Result<Option<f64>, ProviderError> {
        let preview_url = self.preview_url(track).await?;

        let response = self.http_client.get(&preview_url).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }
        let bytes = response.bytes().await?.to_vec();
        debug!(track_id = %track.track_id, bytes = bytes.len(), "Downloaded preview");

        let seconds = self.analysis_seconds;
        tokio::task::spawn_blocking(move || {
            let audio = decode_mono(bytes, Some("mp3"), seconds)?;
            Ok::<_, ProviderError>(estimate_bpm(&audio.samples, audio.sample_rate))
        })
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Tempo analysis aborted: {}", e)))?
    }
}

/// Estimate tempo in BPM; `None` for silence or clips too short to analyse
pub fn estimate_bpm(samples: &[f32], sample_rate: u32) -> Option<f64> {
    if sample_rate == 0 || samples.len() < FRAME_SIZE {
        return None;
    }
    let frame_rate = sample_rate as f64 / HOP_SIZE as f64;

    let energy: Vec<f64> = (0..=(samples.len() - FRAME_SIZE) / HOP_SIZE)
        .map(|i| {
            let frame = &samples[i * HOP_SIZE..i * HOP_SIZE + FRAME_SIZE];
            let sum: f64 = frame.iter().map(|s| (*s as f64) * (*s as f64)).sum();
            (sum / FRAME_SIZE as f64).sqrt()
        })
        .collect();

    let raw_onsets: Vec<f64> = std::iter::once(0.0)
        .chain(energy.windows(2).map(|w| (w[1] - w[0]).max(0.0)))
        .collect();
    let onsets: Vec<f64> = (0..raw_onsets.len())
        .map(|i| {
            let prev = if i > 0 { raw_onsets[i - 1] } else { 0.0 };
            let next = raw_onsets.get(i + 1).copied().unwrap_or(0.0);
            0.25 * prev + 0.5 * raw_onsets[i] + 0.25 * next
        })
        .collect();

    if onsets.iter().sum::<f64>() < 1e-9 {
        return None;
    }

    let min_lag = (60.0 * frame_rate / MAX_BPM).floor().max(1.0) as usize;
    let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;
    if onsets.len() < max_lag * 2 {
        return None;
    }

    let score = |lag: usize| -> f64 {
        let pairs = onsets.len() - lag;
        let ac: f64 = (0..pairs).map(|i| onsets[i] * onsets[i + lag]).sum::<f64>() / pairs as f64;
        let bpm = 60.0 * frame_rate / lag as f64;
        let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_WIDTH;
        ac * (-0.5 * octaves * octaves).exp()
    };

    let scores: Vec<(usize, f64)> = (min_lag..=max_lag).map(|lag| (lag, score(lag))).collect();
    let (best_index, &(best_lag, best)) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1 .1.total_cmp(&b.1 .1))?;
    if best <= 0.0 {
        return None;
    }

    let mut lag = best_lag as f64;
    if best_index > 0 && best_index + 1 < scores.len() {
        let (y0, y1, y2) = (scores[best_index - 1].1, best, scores[best_index + 1].1);
        let denom = y0 - 2.0 * y1 + y2;
        if denom.abs() > f64::EPSILON {
            lag += (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
        }
    }

    let bpm = 60.0 * frame_rate / lag;
    Some((bpm * 10.0).round() / 10.0)
}
