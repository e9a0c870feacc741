//! Client State Reconciler
//!
//! Folds the progress stream of one job into a [`PlaylistView`]. The view
//! is never mutated in place: every effective change produces a new track
//! list behind a new `Arc`, and a change that alters nothing keeps the old
//! one, so renderers can detect updates with `Arc::ptr_eq`.

use songgraph_common::api::PlaylistWithTracks;
use songgraph_common::{PlaylistMetadata, ProgressEvent, Stage, StageProgress, Track, TrackUpdate};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle of one playlist session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing loaded yet
    #[default]
    Empty,
    /// Tracks known, enrichment in progress
    Loading,
    /// Job completed
    Ready,
    /// Job-level failure; merged data is kept
    Failed(String),
}

/// Progress counter for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageCounter {
    pub current: usize,
    pub total: usize,
}

/// Reconciled client-side view of a playlist
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaylistView {
    pub metadata: Option<PlaylistMetadata>,
    pub playlist_name: String,
    pub tracks: Arc<Vec<Track>>,
    pub state: SessionState,
    pub progress: HashMap<Stage, StageCounter>,
    /// Latest human-readable progress message
    pub message: Option<String>,
}

impl PlaylistView {
    /// View for a freshly loaded playlist: tracks shown, enrichment pending
    pub fn loaded(playlist: PlaylistWithTracks) -> Self {
        Self {
            metadata: Some(playlist.metadata),
            playlist_name: playlist.playlist_name,
            tracks: Arc::new(playlist.tracks),
            state: SessionState::Loading,
            progress: HashMap::new(),
            message: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<StageCounter> {
        self.progress.get(&stage).copied()
    }

    pub fn all_features_loaded(&self) -> bool {
        all_features_loaded(&self.tracks)
    }
}

/// True iff there are tracks and every one is settled on both dimensions
pub fn all_features_loaded(tracks: &[Track]) -> bool {
    !tracks.is_empty() && tracks.iter().all(Track::is_fully_resolved)
}

/// Overlay one partial update onto the matching track.
///
/// Unknown ids and updates that change nothing return the same `Arc`.
pub fn merge(tracks: &Arc<Vec<Track>>, update: &TrackUpdate) -> Arc<Vec<Track>> {
    let Some(position) = tracks.iter().position(|t| t.track_id == update.track_id) else {
        return Arc::clone(tracks);
    };
    match tracks[position].with_update(update) {
        Some(merged) => {
            let mut next = tracks.as_ref().clone();
            next[position] = merged;
            Arc::new(next)
        }
        None => Arc::clone(tracks),
    }
}

/// Overlay the enrichment fields of a full track list (terminal events).
///
/// Unresolved fields in `incoming` never erase resolved ones.
pub fn merge_all(tracks: &Arc<Vec<Track>>, incoming: &[Track]) -> Arc<Vec<Track>> {
    incoming.iter().fold(Arc::clone(tracks), |acc, track| {
        merge(&acc, &track.enrichment_update())
    })
}

/// Pure reducer: the view after applying `event`
pub fn reduce(view: &PlaylistView, event: &ProgressEvent) -> PlaylistView {
    match event {
        ProgressEvent::TrackUpdate { track_update, .. } => {
            let tracks = merge(&view.tracks, track_update);
            if Arc::ptr_eq(&tracks, &view.tracks) {
                return view.clone();
            }
            PlaylistView {
                tracks,
                ..view.clone()
            }
        }
        ProgressEvent::Progress(progress) if progress.stage == Stage::Unknown => view.clone(),
        ProgressEvent::Progress(progress) => reduce_progress(view, progress),
        ProgressEvent::Unknown => view.clone(),
    }
}

fn reduce_progress(view: &PlaylistView, progress: &StageProgress) -> PlaylistView {
    let mut next = view.clone();

    if let Some(name) = &progress.playlist_name {
        if next.playlist_name.is_empty() || progress.stage == Stage::Tracks {
            next.playlist_name = name.clone();
        }
    }

    if let Some(tracks) = &progress.tracks {
        next.tracks = if view.tracks.is_empty() {
            Arc::new(tracks.clone())
        } else {
            merge_all(&view.tracks, tracks)
        };
    }

    let counter = next.progress.entry(progress.stage).or_default();
    counter.current = counter.current.max(progress.current);
    counter.total = progress.total;
    if progress.message.is_some() {
        next.message = progress.message.clone();
    }

    next.state = match (&view.state, progress.stage) {
        (_, Stage::Error) => SessionState::Failed(
            progress
                .error
                .clone()
                .or_else(|| progress.message.clone())
                .unwrap_or_else(|| "Enrichment failed".to_string()),
        ),
        (SessionState::Failed(message), _) => SessionState::Failed(message.clone()),
        (_, Stage::Complete) => SessionState::Ready,
        (_, Stage::Tracks) => SessionState::Loading,
        (SessionState::Empty, _) if !next.tracks.is_empty() => SessionState::Loading,
        (state, _) => state.clone(),
    };

    next
}

/// Holds the single authoritative view and applies events against it
#[derive(Debug, Default)]
pub struct Reconciler {
    view: PlaylistView,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_view(view: PlaylistView) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &PlaylistView {
        &self.view
    }

    /// Replace the view with a freshly loaded playlist
    pub fn load(&mut self, playlist: PlaylistWithTracks) {
        self.view = PlaylistView::loaded(playlist);
    }

    /// Apply one event; returns whether the view changed
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        let next = reduce(&self.view, event);
        let changed = next != self.view;
        self.view = next;
        changed
    }
}
