//! Progress events streamed from an enrichment job to its subscriber
//!
//! Events are serialized as JSON objects discriminated by `type`:
//! `progress` (stage counters, terminal events) and `track_update`
//! (partial per-track field updates). Any other `type` decodes to
//! [`ProgressEvent::Unknown`] so older clients keep working against newer
//! servers.

use crate::track::{Dimension, Track, TrackUpdate};
use serde::{Deserialize, Serialize};

/// Pipeline stage reported by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Track list registered
    Tracks,
    /// Tempo resolution
    AudioFeatures,
    /// Lyrics fetched (first half of sentiment resolution)
    Lyrics,
    /// Sentiment resolution
    Sentiment,
    /// Terminal: every track resolved on both dimensions
    Complete,
    /// Terminal: job-level failure
    Error,
    /// Stage introduced by a newer server; receivers ignore it
    #[serde(other)]
    Unknown,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Tracks => "tracks",
            Stage::AudioFeatures => "audio_features",
            Stage::Lyrics => "lyrics",
            Stage::Sentiment => "sentiment",
            Stage::Complete => "complete",
            Stage::Error => "error",
            Stage::Unknown => "unknown",
        }
    }
}

/// Stage progress payload
///
/// `current`/`total` count tracks, not (track × dimension) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: Stage,
    #[serde(default)]
    pub current: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full track list (initial `tracks` event and terminal events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    /// Job-level failure message (stage `error` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageProgress {
    pub fn new(stage: Stage, current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            current,
            total,
            message: Some(message.into()),
            tracks: None,
            playlist_name: None,
            error: None,
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks = Some(tracks);
        self
    }

    pub fn with_playlist_name(mut self, playlist_name: impl Into<String>) -> Self {
        self.playlist_name = Some(playlist_name.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// One entry of a job's progress log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Stage counters; terminal when the stage is `complete` or `error`
    Progress(StageProgress),

    /// Newly resolved field(s) of one track
    TrackUpdate {
        /// Informational: which dimension this update carries
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<Dimension>,
        track_update: TrackUpdate,
    },

    /// Event type this build does not know about
    #[serde(other)]
    Unknown,
}

impl ProgressEvent {
    pub fn progress(stage: Stage, current: usize, total: usize, message: impl Into<String>) -> Self {
        ProgressEvent::Progress(StageProgress::new(stage, current, total, message))
    }

    pub fn track_update(update: TrackUpdate) -> Self {
        ProgressEvent::TrackUpdate {
            field: update.dimension(),
            track_update: update,
        }
    }

    /// Stage of a progress event
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProgressEvent::Progress(progress) => Some(progress.stage),
            _ => None,
        }
    }

    /// After a terminal event the channel closes
    pub fn is_terminal(&self) -> bool {
        self.stage().is_some_and(Stage::is_terminal)
    }

    /// SSE event name (mirrors the JSON `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Progress(_) => "progress",
            ProgressEvent::TrackUpdate { .. } => "track_update",
            ProgressEvent::Unknown => "unknown",
        }
    }
}
