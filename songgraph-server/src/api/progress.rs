//! Progress channel endpoints
//!
//! `progress-stream` replays a job's log over SSE and follows it until the
//! terminal event; `progress` returns a point-in-time snapshot.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use songgraph_common::api::JobSnapshot;
use songgraph_common::sse::progress_to_sse;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ApiResult, AppState};

/// GET /api/progress-stream/{job_id}
///
/// Unknown or malformed ids fail with 404 before the stream starts.
pub async fn progress_stream(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut events = state.jobs.subscribe(&job_id).await?;
    debug!(job_id = %job_id, "SSE client connected");

    let stream = async_stream::stream! {
        while let Some(event) = events.next().await {
            match progress_to_sse(&event) {
                Ok(sse) => {
                    yield Ok::<_, Infallible>(sse);
                }
                Err(e) => {
                    warn!(job_id = %job_id, "SSE: Failed to serialize event {}: {}", event.event_type(), e);
                }
            }
        }
        debug!(job_id = %job_id, "SSE: progress stream closed");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

/// GET /api/progress/{job_id}
pub async fn job_snapshot(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    let job = state.jobs.find(&job_id).await?;
    Ok(Json(job.snapshot()))
}

/// Build progress routes
pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/api/progress-stream/:job_id", get(progress_stream))
        .route("/api/progress/:job_id", get(job_snapshot))
}
