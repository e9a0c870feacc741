//! Lyric sentiment via remote Hugging Face inference
//!
//! Lyrics are normalized, split into stanzas and each stanza is classified
//! by a 3-class (negative / neutral / positive) model. The class and its
//! confidence map to a valence in [0, 1]; the track score is the mean over
//! stanzas. Playlist-level normalization happens on the client.

use super::{error_for_status, http_client, LyricSentiment, ProviderError, SentimentModel};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use songgraph_common::SentimentBreakdown;
use std::sync::OnceLock;
use tracing::debug;

/// Stanzas shorter than this are structure artifacts
const MIN_STANZA_WORDS: usize = 10;
/// Model input cap, in characters
const MAX_STANZA_CHARS: usize = 2000;

/// Remote sentiment classifier
pub struct HuggingFaceSentiment {
    http_client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HuggingFaceSentiment {
    pub fn new(
        api_base: &str,
        model: &str,
        api_token: Option<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(30)?,
            endpoint: format!("{}/{}", api_base.trim_end_matches('/'), model),
            api_token,
        })
    }

    async fn classify(&self, text: &str) -> Result<(String, f64), ProviderError> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({ "inputs": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }
        let body: Value = response.json().await?;
        top_label(&body)
    }
}

#[async_trait]
impl SentimentModel for HuggingFaceSentiment {
    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        if self.api_token.is_none() {
            return Err(ProviderError::Unavailable(
                "Sentiment model not configured (HF_API_TOKEN)".to_string(),
            ));
        }
        Ok(())
    }

    async fn score(&self, lyrics: &str) -> Result<LyricSentiment, ProviderError> {
        let processed = preprocess_lyrics(lyrics);
        if processed.is_empty() {
            return Ok(LyricSentiment::default());
        }

        let stanzas = split_into_stanzas(&processed);
        let mut valences = Vec::with_capacity(stanzas.len());
        let mut last_error = None;

        for stanza in &stanzas {
            let input: String = stanza.chars().take(MAX_STANZA_CHARS).collect();
            match self.classify(&input).await {
                Ok((label, confidence)) => valences.push(label_valence(&label, confidence)),
                Err(e) => {
                    debug!("Skipping stanza that failed to classify: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match (mean(&valences), last_error) {
            // Every stanza failed: report the provider error, not "no answer"
            (None, Some(e)) => Err(e),
            (score, _) => Ok(LyricSentiment {
                score,
                breakdown: SentimentBreakdown {
                    chunks: stanzas.len(),
                    stanza_scores: valences,
                },
            }),
        }
    }
}

/// Highest-scoring label of a text-classification response.
///
/// Accepts both `[{label, score}, ...]` and `[[{label, score}, ...]]`.
fn top_label(body: &Value) -> Result<(String, f64), ProviderError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(ProviderError::Unavailable(error.to_string()));
    }

    let candidates: &[Value] = match body.as_array() {
        Some(outer) => match outer.first() {
            Some(Value::Array(inner)) => inner.as_slice(),
            _ => outer.as_slice(),
        },
        None => &[],
    };

    candidates
        .iter()
        .filter_map(|c| {
            let label = c.get("label")?.as_str()?;
            let score = c.get("score")?.as_f64()?;
            Some((label.to_string(), score))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| ProviderError::Parse(format!("Unexpected classifier response: {}", body)))
}

/// Map a class label and its confidence to valence in [0, 1]
pub fn label_valence(label: &str, confidence: f64) -> f64 {
    let label = label.to_lowercase();
    let confidence = confidence.clamp(0.0, 1.0);
    if label.contains("negative") || label == "label_0" {
        (1.0 - confidence) * 0.5
    } else if label.contains("neutral") || label == "label_1" {
        0.5
    } else {
        0.5 + confidence * 0.5
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

struct LyricPatterns {
    section_header: Regex,
    repeat_count: Regex,
    repeat_marker: Regex,
    extra_newlines: Regex,
    spaces: Regex,
    stanza_break: Regex,
}

static LYRIC_PATTERNS: OnceLock<LyricPatterns> = OnceLock::new();

fn lyric_patterns() -> &'static LyricPatterns {
    LYRIC_PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).expect("invalid regex pattern");
        LyricPatterns {
            section_header: compile(r"\[.*?\]"),
            repeat_count: compile(r"\(x\d+\)"),
            repeat_marker: compile(r"(?i)\(repeat\)"),
            extra_newlines: compile(r"\n{3,}"),
            spaces: compile(r" +"),
            stanza_break: compile(r"\n\n+"),
        }
    })
}

/// Normalize lyrics for classification.
///
/// Lowercases, removes `[section]` headers and `(x2)` / `(repeat)` markers,
/// collapses runs of 3+ newlines to a stanza break and repeated spaces to one.
pub fn preprocess_lyrics(lyrics: &str) -> String {
    let patterns = lyric_patterns();
    let lowered = lyrics.to_lowercase();

    let text = patterns.section_header.replace_all(&lowered, "");
    let text = patterns.repeat_count.replace_all(&text, "");
    let text = patterns.repeat_marker.replace_all(&text, "");
    let text = patterns.extra_newlines.replace_all(&text, "\n\n");
    let text = patterns.spaces.replace_all(&text, " ");
    text.trim().to_string()
}

/// Split preprocessed lyrics on blank lines, keeping stanzas of at least
/// ten words; falls back to the whole text when none qualify
pub fn split_into_stanzas(lyrics: &str) -> Vec<String> {
    if lyrics.is_empty() {
        return Vec::new();
    }
    let stanzas: Vec<String> = lyric_patterns()
        .stanza_break
        .split(lyrics)
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() >= MIN_STANZA_WORDS)
        .map(str::to_string)
        .collect();

    if stanzas.is_empty() {
        vec![lyrics.to_string()]
    } else {
        stanzas
    }
}
