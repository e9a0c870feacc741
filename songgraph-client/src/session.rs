//! Playlist session
//!
//! Drives one playlist through load → enrich → ready, feeding every
//! progress event through the single [`Reconciler`].

use crate::api::PlaylistApi;
use crate::error::ClientError;
use crate::projector::{project, Projection, SentimentMode};
use crate::reconciler::{PlaylistView, Reconciler, SessionState};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Session {
    api: Arc<dyn PlaylistApi>,
    reconciler: Reconciler,
    mode: SentimentMode,
    job_id: Option<Uuid>,
}

impl Session {
    pub fn new(api: Arc<dyn PlaylistApi>) -> Self {
        Self {
            api,
            reconciler: Reconciler::new(),
            mode: SentimentMode::default(),
            job_id: None,
        }
    }

    pub fn view(&self) -> &PlaylistView {
        self.reconciler.view()
    }

    pub fn job_id(&self) -> Option<Uuid> {
        self.job_id
    }

    pub fn mode(&self) -> SentimentMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SentimentMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) -> SentimentMode {
        self.mode = self.mode.toggle();
        self.mode
    }

    /// Display projection of the current view in the current mode
    pub fn projection(&self) -> Projection {
        project(&self.view().tracks, self.mode)
    }

    /// Fetch metadata and track list; the view moves to Loading
    pub async fn load(&mut self, playlist_url: &str) -> Result<&PlaylistView, ClientError> {
        let playlist = self.api.playlist_with_tracks(playlist_url).await?;
        info!(
            "Loaded playlist {:?} with {} tracks",
            playlist.playlist_name, playlist.track_count
        );
        self.reconciler.load(playlist);
        self.job_id = None;
        Ok(self.view())
    }

    /// Start enrichment for the loaded playlist and follow it to a terminal event.
    ///
    /// `on_change` runs after every event that changed the view. Returns the
    /// final session state (`Ready` or `Failed`).
    pub async fn enrich<F>(&mut self, on_change: F) -> Result<SessionState, ClientError>
    where
        F: FnMut(&PlaylistView),
    {
        if self.view().state == SessionState::Empty {
            return Err(ClientError::Common(songgraph_common::Error::InvalidInput(
                "No playlist loaded".to_string(),
            )));
        }
        let tracks = Arc::clone(&self.view().tracks);
        let job_id = self
            .api
            .create_job(&tracks, &self.view().playlist_name)
            .await?;
        info!(job_id = %job_id, "Enrichment started for {} tracks", tracks.len());
        self.job_id = Some(job_id);
        self.follow(job_id, on_change).await
    }

    /// Reattach to a job after a dropped connection; the log is replayed
    /// from the start and merged idempotently into the kept view.
    pub async fn resubscribe<F>(&mut self, job_id: Uuid, on_change: F) -> Result<SessionState, ClientError>
    where
        F: FnMut(&PlaylistView),
    {
        self.job_id = Some(job_id);
        self.follow(job_id, on_change).await
    }

    async fn follow<F>(&mut self, job_id: Uuid, mut on_change: F) -> Result<SessionState, ClientError>
    where
        F: FnMut(&PlaylistView),
    {
        let mut events = self.api.subscribe(job_id).await?;

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!(job_id = %job_id, "Progress stream failed: {}", e);
                    return Err(e);
                }
            };
            if self.reconciler.apply(&event) {
                on_change(self.reconciler.view());
            }
            if event.is_terminal() {
                debug!(job_id = %job_id, "Terminal event received");
                return Ok(self.view().state.clone());
            }
        }

        warn!(job_id = %job_id, "Progress stream ended before a terminal event");
        Err(ClientError::Transport(
            "progress stream closed before the job finished".to_string(),
        ))
    }
}
