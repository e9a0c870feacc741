//! songgraph-server library interface
//!
//! Exposes the router, state and enrichment pipeline for the binary and
//! for integration tests.

pub mod api;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod providers;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServerSettings;
use crate::enrichment::EnrichmentUnit;
use crate::jobs::JobRegistry;
use crate::orchestrator::{JobOrchestrator, WorkerLimits};
use crate::providers::{PlaylistSource, Providers};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playlist metadata and track lookup
    pub playlists: Arc<dyn PlaylistSource>,
    /// Live and recently finished jobs
    pub jobs: JobRegistry,
    /// Starts enrichment jobs
    pub orchestrator: JobOrchestrator,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(providers: Providers, settings: &ServerSettings) -> Self {
        let jobs = JobRegistry::new();
        let unit = Arc::new(EnrichmentUnit::new(
            providers.tempo,
            providers.lyrics,
            providers.sentiment,
            settings.provider_timeout,
        ));
        let orchestrator = JobOrchestrator::new(
            jobs.clone(),
            unit,
            WorkerLimits {
                bpm_max_workers: settings.bpm_max_workers,
                sentiment_max_workers: settings.sentiment_max_workers,
            },
        );

        Self {
            playlists: providers.playlists,
            jobs,
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::playlist_routes())
        .merge(api::feature_routes())
        .merge(api::progress_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
