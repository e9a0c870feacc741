//! HTTP API request/response types shared by server and client

use crate::track::{PlaylistMetadata, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playlist name used when a request does not carry one
pub const DEFAULT_PLAYLIST_NAME: &str = "Unknown Playlist";

/// GET /api/playlist-with-tracks response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistWithTracks {
    pub playlist_name: String,
    pub track_count: usize,
    pub metadata: PlaylistMetadata,
    pub tracks: Vec<Track>,
}

/// POST /api/process-features request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFeaturesRequest {
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub playlist_name: Option<String>,
}

/// POST /api/process-playlist-stream request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPlaylistRequest {
    #[serde(default)]
    pub playlist_url: String,
}

/// POST /api/process-features and /api/process-playlist-stream response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFeaturesResponse {
    pub job_id: Uuid,
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Complete,
    Error,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// GET /api/progress/{job_id} response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub state: JobState,
    pub playlist_name: String,
    pub event_count: usize,
    pub tracks: Vec<Track>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
