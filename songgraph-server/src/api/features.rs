//! Enrichment job creation

use axum::{extract::State, routing::post, Json, Router};
use songgraph_common::api::{
    ProcessFeaturesRequest, ProcessFeaturesResponse, ProcessPlaylistRequest, DEFAULT_PLAYLIST_NAME,
};

use super::playlist::{load_tracks, required_url};
use crate::{ApiResult, AppState};

/// POST /api/process-features
///
/// Starts enrichment for the given tracks and returns the job id at once.
/// Progress is read from `/api/progress-stream/{job_id}`.
pub async fn process_features(
    State(state): State<AppState>,
    Json(request): Json<ProcessFeaturesRequest>,
) -> ApiResult<Json<ProcessFeaturesResponse>> {
    let job_id = state
        .orchestrator
        .create_job(playlist_name_or_default(request.playlist_name), request.tracks)
        .await?;

    Ok(Json(ProcessFeaturesResponse { job_id }))
}

/// POST /api/process-playlist-stream
///
/// Looks the playlist up, then starts enrichment of its tracks exactly as
/// `/api/process-features` does. Lookup failures are returned directly.
pub async fn process_playlist_stream(
    State(state): State<AppState>,
    Json(request): Json<ProcessPlaylistRequest>,
) -> ApiResult<Json<ProcessFeaturesResponse>> {
    let url = required_url(&request.playlist_url)?;
    let (tracks, playlist_name) = load_tracks(&state, url).await?;

    let job_id = state
        .orchestrator
        .create_job(playlist_name_or_default(Some(playlist_name)), tracks)
        .await?;

    Ok(Json(ProcessFeaturesResponse { job_id }))
}

fn playlist_name_or_default(name: Option<String>) -> String {
    name.filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PLAYLIST_NAME.to_string())
}

/// Build feature-processing routes
pub fn feature_routes() -> Router<AppState> {
    Router::new()
        .route("/api/process-features", post(process_features))
        .route("/api/process-playlist-stream", post(process_playlist_stream))
}
