//! Shared fixtures for songgraph-client integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use songgraph_client::api::{EventStream, PlaylistApi};
use songgraph_client::ClientError;
use songgraph_common::api::PlaylistWithTracks;
use songgraph_common::{
    Dimension, PlaylistMetadata, ProgressEvent, Resolution, Stage, StageProgress, Track,
    TrackUpdate,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub const PLAYLIST_NAME: &str = "Road Trip";

pub fn three_tracks() -> Vec<Track> {
    ["track1", "track2", "track3"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut track = Track::new(*id, format!("Song {}", i + 1));
            track.artists = vec![format!("Artist {}", i + 1)];
            track.duration_ms = 200_000;
            track
        })
        .collect()
}

pub fn playlist() -> PlaylistWithTracks {
    let tracks = three_tracks();
    PlaylistWithTracks {
        playlist_name: PLAYLIST_NAME.to_string(),
        track_count: tracks.len(),
        metadata: PlaylistMetadata {
            playlist_id: "pl1".to_string(),
            name: PLAYLIST_NAME.to_string(),
            total_tracks: 3,
            ..Default::default()
        },
        tracks,
    }
}

pub fn tempo(id: &str, bpm: f64) -> TrackUpdate {
    TrackUpdate::new(id, Dimension::Tempo, Resolution::Resolved(Some(bpm)))
}

pub fn sentiment(id: &str, score: f64) -> TrackUpdate {
    TrackUpdate::new(id, Dimension::Sentiment, Resolution::Resolved(Some(score)))
}

pub fn sentiment_failed(id: &str, message: &str) -> TrackUpdate {
    TrackUpdate::new(id, Dimension::Sentiment, Resolution::Failed(message.to_string()))
}

/// The six updates of the 3-track scenario, in server emission order
pub fn scenario_updates(track2_lyrics_missing: bool) -> Vec<TrackUpdate> {
    let track2 = if track2_lyrics_missing {
        sentiment_failed("track2", "lyrics not found")
    } else {
        sentiment("track2", 0.5)
    };
    vec![
        tempo("track1", 120.0),
        tempo("track2", 95.5),
        sentiment("track1", 0.9),
        tempo("track3", 140.0),
        track2,
        sentiment("track3", 0.1),
    ]
}

/// Full event log the server would emit for the 3-track scenario
pub fn scenario_events(track2_lyrics_missing: bool) -> Vec<ProgressEvent> {
    let mut tracks = three_tracks();
    let total = tracks.len();
    let mut events = vec![ProgressEvent::Progress(
        StageProgress::new(Stage::Tracks, 0, total, "Tracks loaded")
            .with_tracks(tracks.clone())
            .with_playlist_name(PLAYLIST_NAME),
    )];

    let (mut bpm, mut lyrics, mut scored) = (0, 0, 0);
    for update in scenario_updates(track2_lyrics_missing) {
        if let Some(track) = tracks.iter_mut().find(|t| t.track_id == update.track_id) {
            if let Some(merged) = track.with_update(&update) {
                *track = merged;
            }
        }
        let dimension = update.dimension();
        if dimension == Some(Dimension::Sentiment) && !update.sentiment.is_failed() {
            lyrics += 1;
            events.push(ProgressEvent::progress(
                Stage::Lyrics,
                lyrics,
                total,
                format!("Fetching lyrics: {}/{}", lyrics, total),
            ));
        }
        events.push(ProgressEvent::track_update(update));
        events.push(match dimension {
            Some(Dimension::Tempo) => {
                bpm += 1;
                ProgressEvent::progress(
                    Stage::AudioFeatures,
                    bpm,
                    total,
                    format!("Calculating BPM: {}/{}", bpm, total),
                )
            }
            _ => {
                scored += 1;
                ProgressEvent::progress(
                    Stage::Sentiment,
                    scored,
                    total,
                    format!("Analyzing sentiment: {}/{}", scored, total),
                )
            }
        });
    }

    events.push(ProgressEvent::Progress(
        StageProgress::new(Stage::Complete, total, total, "Enrichment complete").with_tracks(tracks),
    ));
    events
}

/// How the mock ends a subscription
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Deliver every event
    Full(Vec<ProgressEvent>),
    /// Deliver the events, then a transport error
    DropAfter(Vec<ProgressEvent>),
    /// Deliver the events, then end without a terminal event
    EndAfter(Vec<ProgressEvent>),
}

/// In-memory [`PlaylistApi`] counting every call
pub struct MockApi {
    pub job_id: Uuid,
    pub playlist_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    scripts: Mutex<Vec<StreamScript>>,
}

impl MockApi {
    /// Subscriptions consume `scripts` in order
    pub fn new(scripts: Vec<StreamScript>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            playlist_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            scripts: Mutex::new(scripts),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.playlist_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaylistApi for MockApi {
    async fn playlist_with_tracks(&self, playlist_url: &str) -> Result<PlaylistWithTracks, ClientError> {
        self.playlist_calls.fetch_add(1, Ordering::SeqCst);
        if playlist_url == "unknown" {
            return Err(ClientError::Api {
                status: 404,
                message: "Playlist not found".to_string(),
            });
        }
        Ok(playlist())
    }

    async fn create_job(&self, _tracks: &[Track], _playlist_name: &str) -> Result<Uuid, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.job_id)
    }

    async fn subscribe(&self, job_id: Uuid) -> Result<EventStream, ClientError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if job_id != self.job_id {
            return Err(ClientError::Api {
                status: 404,
                message: format!("Job not found: {}", job_id),
            });
        }
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                StreamScript::EndAfter(Vec::new())
            } else {
                scripts.remove(0)
            }
        };
        let items: Vec<Result<ProgressEvent, ClientError>> = match script {
            StreamScript::Full(events) | StreamScript::EndAfter(events) => {
                events.into_iter().map(Ok).collect()
            }
            StreamScript::DropAfter(events) => events
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ClientError::Transport(
                    "connection reset".to_string(),
                ))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}
