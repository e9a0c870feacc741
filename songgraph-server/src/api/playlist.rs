//! Playlist lookup endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use songgraph_common::api::PlaylistWithTracks;
use songgraph_common::{PlaylistMetadata, Track};
use tracing::info;

use crate::orchestrator::dedupe_tracks;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PlaylistQuery {
    #[serde(default)]
    pub playlist_url: String,
}

impl PlaylistQuery {
    fn url(&self) -> ApiResult<&str> {
        required_url(&self.playlist_url)
    }
}

pub(crate) fn required_url(playlist_url: &str) -> ApiResult<&str> {
    let url = playlist_url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("playlist_url is required".to_string()));
    }
    Ok(url)
}

/// Track list of a playlist, one entry per track, plus the playlist name
pub(crate) async fn load_tracks(state: &AppState, url: &str) -> ApiResult<(Vec<Track>, String)> {
    let (tracks, playlist_name) = state.playlists.tracks(url).await?;
    let tracks = dedupe_tracks(tracks);
    info!(
        playlist = %playlist_name,
        tracks = tracks.len(),
        "Playlist loaded"
    );
    Ok((tracks, playlist_name))
}

/// GET /api/playlist-with-tracks?playlist_url=...
///
/// Metadata and track list, without enrichment
pub async fn playlist_with_tracks(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> ApiResult<Json<PlaylistWithTracks>> {
    let url = query.url()?;

    let metadata = state.playlists.metadata(url).await?;
    let (tracks, playlist_name) = load_tracks(&state, url).await?;

    Ok(Json(PlaylistWithTracks {
        playlist_name,
        track_count: tracks.len(),
        metadata,
        tracks,
    }))
}

/// GET /api/playlist-metadata?playlist_url=...
pub async fn playlist_metadata(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> ApiResult<Json<PlaylistMetadata>> {
    let url = query.url()?;
    Ok(Json(state.playlists.metadata(url).await?))
}

/// Build playlist routes
pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/playlist-with-tracks", get(playlist_with_tracks))
        .route("/api/playlist-metadata", get(playlist_metadata))
}
