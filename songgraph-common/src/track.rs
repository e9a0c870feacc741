//! Track record and per-field enrichment state
//!
//! A track carries immutable playlist metadata plus two independently
//! resolved enrichment fields (tempo and sentiment). Each field is in exactly
//! one of three states, see [`Resolution`].
//!
//! # Wire format
//!
//! | State        | Value key (`tempo` / `sentiment_score`) | Error key (`audio_features_error` / `sentiment_error`) |
//! |--------------|-----------------------------------------|--------------------------------------------------------|
//! | Unresolved   | absent                                  | absent or `null`                                       |
//! | Resolved     | number or `null`                        | absent or `null`                                       |
//! | Failed       | `null`                                  | non-empty string                                       |
//!
//! A non-empty error always wins over the value key when decoding.
//!
//! A resolved sentiment may also carry its per-stanza breakdown as
//! `sentiment_chunks` (stanzas submitted) and `stanza_scores`.

use serde::{Deserialize, Deserializer, Serialize};

/// Enrichment dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Tempo,
    Sentiment,
}

/// Resolution state of one enrichment field
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// Not resolved yet (absent from the wire record)
    Unresolved,
    /// Provider answered; `None` means "provider had no answer"
    Resolved(Option<T>),
    /// Resolution failed with a short human-readable message
    Failed(String),
}

impl<T> Default for Resolution<T> {
    fn default() -> Self {
        Resolution::Unresolved
    }
}

impl<T: Clone + PartialEq> Resolution<T> {
    /// Resolved or failed (the field will not change state again)
    pub fn is_settled(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }

    /// Resolved numeric value, if any
    pub fn value(&self) -> Option<T> {
        match self {
            Resolution::Resolved(value) => value.clone(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Resolution::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Field-wise overlay: an unresolved incoming state leaves `self` untouched,
    /// anything else overwrites.
    pub fn overlay(&self, incoming: &Resolution<T>) -> Resolution<T> {
        match incoming {
            Resolution::Unresolved => self.clone(),
            other => other.clone(),
        }
    }

    fn from_wire(value: Option<Option<T>>, error: Option<String>) -> Self {
        match (value, error.filter(|e| !e.is_empty())) {
            (_, Some(message)) => Resolution::Failed(message),
            (Some(value), None) => Resolution::Resolved(value),
            (None, None) => Resolution::Unresolved,
        }
    }

    fn to_wire(&self) -> (Option<Option<T>>, Option<String>) {
        match self {
            Resolution::Unresolved => (None, None),
            Resolution::Resolved(value) => (Some(value.clone()), None),
            Resolution::Failed(message) => (Some(None), Some(message.clone())),
        }
    }
}

/// Per-stanza detail behind a sentiment score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    /// Stanzas submitted to the classifier
    pub chunks: usize,
    /// Valence of each stanza that classified, in lyric order
    pub stanza_scores: Vec<f64>,
}

impl SentimentBreakdown {
    fn from_wire(chunks: Option<usize>, stanza_scores: Option<Vec<f64>>) -> Option<Self> {
        if chunks.is_none() && stanza_scores.is_none() {
            return None;
        }
        let stanza_scores = stanza_scores.unwrap_or_default();
        Some(Self {
            chunks: chunks.unwrap_or(stanza_scores.len()),
            stanza_scores,
        })
    }

    fn to_wire(breakdown: Option<Self>) -> (Option<usize>, Option<Vec<f64>>) {
        match breakdown {
            Some(b) => (Some(b.chunks), Some(b.stanza_scores)),
            None => (None, None),
        }
    }
}

/// A playlist track with its enrichment state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackRecord", into = "TrackRecord")]
pub struct Track {
    /// Stable identifier, unique within a playlist
    pub track_id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub album_art_url: Option<String>,
    pub album_release_date: Option<String>,
    pub duration_ms: u64,
    pub popularity: Option<u32>,
    pub track_url: Option<String>,
    pub preview_url: Option<String>,
    /// Beats per minute
    pub tempo: Resolution<f64>,
    /// Raw lyric valence in [0, 1]
    pub sentiment: Resolution<f64>,
    pub sentiment_breakdown: Option<SentimentBreakdown>,
}

impl Track {
    /// Track with metadata only, both enrichment fields unresolved
    pub fn new(track_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            title: title.into(),
            artists: Vec::new(),
            album: String::new(),
            album_art_url: None,
            album_release_date: None,
            duration_ms: 0,
            popularity: None,
            track_url: None,
            preview_url: None,
            tempo: Resolution::Unresolved,
            sentiment: Resolution::Unresolved,
            sentiment_breakdown: None,
        }
    }

    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    /// Both dimensions resolved or failed
    pub fn is_fully_resolved(&self) -> bool {
        self.tempo.is_settled() && self.sentiment.is_settled()
    }

    pub fn resolution(&self, dimension: Dimension) -> &Resolution<f64> {
        match dimension {
            Dimension::Tempo => &self.tempo,
            Dimension::Sentiment => &self.sentiment,
        }
    }

    /// Overlay a partial update onto this track.
    ///
    /// Returns `None` when the update targets another track or would not
    /// change anything, so callers can keep the previous value (and its
    /// identity) untouched.
    pub fn with_update(&self, update: &TrackUpdate) -> Option<Track> {
        if update.track_id != self.track_id {
            return None;
        }
        let tempo = self.tempo.overlay(&update.tempo);
        let sentiment = self.sentiment.overlay(&update.sentiment);
        let sentiment_breakdown = update
            .sentiment_breakdown
            .clone()
            .or_else(|| self.sentiment_breakdown.clone());
        if tempo == self.tempo
            && sentiment == self.sentiment
            && sentiment_breakdown == self.sentiment_breakdown
        {
            return None;
        }
        Some(Track {
            tempo,
            sentiment,
            sentiment_breakdown,
            ..self.clone()
        })
    }

    /// Enrichment fields of this track expressed as a partial update
    pub fn enrichment_update(&self) -> TrackUpdate {
        TrackUpdate {
            track_id: self.track_id.clone(),
            tempo: self.tempo.clone(),
            sentiment: self.sentiment.clone(),
            sentiment_breakdown: self.sentiment_breakdown.clone(),
        }
    }
}

/// Partial update for one track: a subset of its enrichment fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackUpdateRecord", into = "TrackUpdateRecord")]
pub struct TrackUpdate {
    pub track_id: String,
    /// `Unresolved` means "not carried by this update"
    pub tempo: Resolution<f64>,
    pub sentiment: Resolution<f64>,
    pub sentiment_breakdown: Option<SentimentBreakdown>,
}

impl TrackUpdate {
    pub fn new(track_id: impl Into<String>, dimension: Dimension, value: Resolution<f64>) -> Self {
        let mut update = Self {
            track_id: track_id.into(),
            tempo: Resolution::Unresolved,
            sentiment: Resolution::Unresolved,
            sentiment_breakdown: None,
        };
        match dimension {
            Dimension::Tempo => update.tempo = value,
            Dimension::Sentiment => update.sentiment = value,
        }
        update
    }

    pub fn with_sentiment_breakdown(mut self, breakdown: SentimentBreakdown) -> Self {
        self.sentiment_breakdown = Some(breakdown);
        self
    }

    /// The single dimension this update carries, if exactly one
    pub fn dimension(&self) -> Option<Dimension> {
        match (self.tempo.is_settled(), self.sentiment.is_settled()) {
            (true, false) => Some(Dimension::Tempo),
            (false, true) => Some(Dimension::Sentiment),
            _ => None,
        }
    }
}

/// Playlist-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistMetadata {
    pub playlist_id: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub owner: Option<String>,
    pub total_tracks: u32,
    pub public: bool,
    pub followers: u64,
}

// ============================================================================
// Wire records
// ============================================================================

/// Deserialize a key that is present (possibly `null`) as `Some(..)`.
/// Combined with `#[serde(default)]`, an absent key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize)]
struct TrackRecord {
    track_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    album_art_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    album_release_date: Option<String>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    popularity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    track_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_url: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    tempo: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio_features_error: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    sentiment_score: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stanza_scores: Option<Vec<f64>>,
}

impl From<TrackRecord> for Track {
    fn from(record: TrackRecord) -> Self {
        Self {
            track_id: record.track_id,
            title: record.title,
            artists: record.artists,
            album: record.album,
            album_art_url: record.album_art_url,
            album_release_date: record.album_release_date,
            duration_ms: record.duration_ms,
            popularity: record.popularity,
            track_url: record.track_url,
            preview_url: record.preview_url,
            tempo: Resolution::from_wire(record.tempo, record.audio_features_error),
            sentiment: Resolution::from_wire(record.sentiment_score, record.sentiment_error),
            sentiment_breakdown: SentimentBreakdown::from_wire(
                record.sentiment_chunks,
                record.stanza_scores,
            ),
        }
    }
}

impl From<Track> for TrackRecord {
    fn from(track: Track) -> Self {
        let (tempo, audio_features_error) = track.tempo.to_wire();
        let (sentiment_score, sentiment_error) = track.sentiment.to_wire();
        let (sentiment_chunks, stanza_scores) =
            SentimentBreakdown::to_wire(track.sentiment_breakdown);
        let duration_min = (track.duration_ms > 0)
            .then(|| (track.duration_ms as f64 / 60_000.0 * 100.0).round() / 100.0);
        Self {
            track_id: track.track_id,
            title: track.title,
            artists: track.artists,
            album: track.album,
            album_art_url: track.album_art_url,
            album_release_date: track.album_release_date,
            duration_ms: track.duration_ms,
            duration_min,
            popularity: track.popularity,
            track_url: track.track_url,
            preview_url: track.preview_url,
            tempo,
            audio_features_error,
            sentiment_score,
            sentiment_error,
            sentiment_chunks,
            stanza_scores,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TrackUpdateRecord {
    track_id: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    tempo: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio_features_error: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    sentiment_score: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stanza_scores: Option<Vec<f64>>,
}

impl From<TrackUpdateRecord> for TrackUpdate {
    fn from(record: TrackUpdateRecord) -> Self {
        Self {
            track_id: record.track_id,
            tempo: Resolution::from_wire(record.tempo, record.audio_features_error),
            sentiment: Resolution::from_wire(record.sentiment_score, record.sentiment_error),
            sentiment_breakdown: SentimentBreakdown::from_wire(
                record.sentiment_chunks,
                record.stanza_scores,
            ),
        }
    }
}

impl From<TrackUpdate> for TrackUpdateRecord {
    fn from(update: TrackUpdate) -> Self {
        let (tempo, audio_features_error) = update.tempo.to_wire();
        let (sentiment_score, sentiment_error) = update.sentiment.to_wire();
        let (sentiment_chunks, stanza_scores) =
            SentimentBreakdown::to_wire(update.sentiment_breakdown);
        Self {
            track_id: update.track_id,
            tempo,
            audio_features_error,
            sentiment_score,
            sentiment_error,
            sentiment_chunks,
            stanza_scores,
        }
    }
}
