//! Reconciler properties over realistic event logs

mod helpers;

use helpers::*;
use songgraph_client::reconciler::{
    all_features_loaded, merge, reduce, PlaylistView, Reconciler, SessionState, StageCounter,
};
use songgraph_common::{ProgressEvent, Resolution, Stage, StageProgress, TrackUpdate};
use std::sync::Arc;

fn loaded() -> Reconciler {
    let mut reconciler = Reconciler::new();
    reconciler.load(playlist());
    reconciler
}

#[test]
fn test_merge_is_idempotent() {
    let tracks = Arc::new(three_tracks());
    let update = tempo("track2", 95.5);

    let once = merge(&tracks, &update);
    let twice = merge(&once, &update);

    assert!(Arc::ptr_eq(&once, &twice));
    assert_eq!(once[1].tempo, Resolution::Resolved(Some(95.5)));
}

#[test]
fn test_merge_preserves_fields_not_in_update() {
    let tracks = Arc::new(three_tracks());
    let tracks = merge(&tracks, &tempo("track1", 120.0));
    let tracks = merge(&tracks, &sentiment("track1", 0.9));

    assert_eq!(tracks[0].tempo.value(), Some(120.0));
    assert_eq!(tracks[0].sentiment.value(), Some(0.9));
    assert_eq!(tracks[0].title, "Song 1");
    assert_eq!(tracks[0].artists, vec!["Artist 1".to_string()]);
    assert!(!tracks[1].tempo.is_settled());

    // A later update that carries nothing for tempo leaves it alone
    let blank = TrackUpdate {
        track_id: "track1".to_string(),
        tempo: Resolution::Unresolved,
        sentiment: Resolution::Unresolved,
        sentiment_breakdown: None,
    };
    assert!(Arc::ptr_eq(&merge(&tracks, &blank), &tracks));
}

#[test]
fn test_resolved_null_is_settled_but_not_numeric() {
    let tracks = Arc::new(three_tracks());
    let update = TrackUpdate::new(
        "track3",
        songgraph_common::Dimension::Tempo,
        Resolution::Resolved(None),
    );
    let merged = merge(&tracks, &update);
    assert!(merged[2].tempo.is_settled());
    assert_eq!(merged[2].tempo.value(), None);
}

#[test]
fn test_completion_predicate() {
    assert!(!all_features_loaded(&[]));

    let mut tracks = Arc::new(three_tracks());
    assert!(!all_features_loaded(&tracks));

    for update in scenario_updates(true) {
        tracks = merge(&tracks, &update);
    }
    // A failed cell counts as settled
    assert!(all_features_loaded(&tracks));
    assert_eq!(tracks[1].sentiment.error(), Some("lyrics not found"));
}

#[test]
fn test_order_independence_across_tracks() {
    let updates = scenario_updates(false);
    let forward = updates
        .iter()
        .fold(Arc::new(three_tracks()), |acc, u| merge(&acc, u));
    let backward = updates
        .iter()
        .rev()
        .fold(Arc::new(three_tracks()), |acc, u| merge(&acc, u));

    assert_eq!(forward, backward);
}

#[test]
fn test_three_track_scenario_loads_after_sixth_update() {
    let mut reconciler = loaded();
    let mut updates_seen = 0;
    let mut loaded_at = None;

    for event in scenario_events(false) {
        let is_update = matches!(event, ProgressEvent::TrackUpdate { .. });
        reconciler.apply(&event);
        if is_update {
            updates_seen += 1;
        }
        if loaded_at.is_none() && reconciler.view().all_features_loaded() {
            loaded_at = Some(updates_seen);
            // Visualization unlocks before the terminal event
            assert_eq!(reconciler.view().state, SessionState::Loading);
        }
    }

    assert_eq!(loaded_at, Some(6));
    let view = reconciler.view();
    assert_eq!(view.state, SessionState::Ready);
    assert_eq!(view.playlist_name, PLAYLIST_NAME);
    let tempos: Vec<_> = view.tracks.iter().map(|t| t.tempo.value()).collect();
    assert_eq!(tempos, vec![Some(120.0), Some(95.5), Some(140.0)]);
    assert_eq!(
        view.stage(Stage::AudioFeatures),
        Some(StageCounter { current: 3, total: 3 })
    );
    assert_eq!(
        view.stage(Stage::Sentiment),
        Some(StageCounter { current: 3, total: 3 })
    );
}

#[test]
fn test_failure_isolation_on_one_cell() {
    let mut reconciler = loaded();
    for event in scenario_events(true) {
        reconciler.apply(&event);
    }

    let view = reconciler.view();
    assert_eq!(view.state, SessionState::Ready);
    assert_eq!(view.tracks[1].sentiment.error(), Some("lyrics not found"));
    assert_eq!(view.tracks[1].tempo.value(), Some(95.5));
    assert_eq!(view.tracks[0].sentiment.value(), Some(0.9));
    assert_eq!(view.tracks[2].sentiment.value(), Some(0.1));
    assert_eq!(view.stage(Stage::Lyrics).map(|c| c.current), Some(2));
}

#[test]
fn test_complete_overlay_never_erases_resolved_fields() {
    let mut reconciler = loaded();
    reconciler.apply(&ProgressEvent::track_update(tempo("track1", 120.0)));

    // Terminal event carrying a stale list
    reconciler.apply(&ProgressEvent::Progress(
        StageProgress::new(Stage::Complete, 3, 3, "Enrichment complete").with_tracks(three_tracks()),
    ));

    assert_eq!(reconciler.view().tracks[0].tempo.value(), Some(120.0));
    assert_eq!(reconciler.view().state, SessionState::Ready);
}

#[test]
fn test_replayed_log_converges_to_same_view() {
    let mut reconciler = loaded();
    let events = scenario_events(false);
    for event in &events {
        reconciler.apply(event);
    }
    let settled = reconciler.view().clone();

    for event in &events {
        let changed = reconciler.apply(event);
        if matches!(event, ProgressEvent::TrackUpdate { .. }) {
            assert!(!changed, "replayed update must be a no-op");
        }
    }
    assert_eq!(reconciler.view(), &settled);
}

#[test]
fn test_error_after_complete_is_not_downgraded_to_ready() {
    let view = PlaylistView::loaded(playlist());
    let failed = reduce(
        &view,
        &ProgressEvent::Progress(
            StageProgress::new(Stage::Error, 0, 3, "Error: Sentiment model unavailable")
                .with_error("Sentiment model unavailable"),
        ),
    );
    let after = reduce(
        &failed,
        &ProgressEvent::progress(Stage::Complete, 3, 3, "Enrichment complete"),
    );
    assert_eq!(
        after.state,
        SessionState::Failed("Sentiment model unavailable".to_string())
    );
    assert_eq!(after.tracks.len(), 3);
}
