//! Test Helper Utilities
//!
//! Scripted in-memory providers and request helpers for songgraph-server
//! integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use songgraph_common::sse::SseDecoder;
use songgraph_common::{PlaylistMetadata, ProgressEvent, Track};
use songgraph_server::config::ServerSettings;
use songgraph_server::providers::{
    LyricSentiment, LyricsProvider, PlaylistSource, ProviderError, Providers, SentimentModel,
    TempoProvider,
};
use songgraph_server::{build_router, AppState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// One scripted provider answer
#[derive(Clone)]
pub struct Scripted<T> {
    pub delay: Duration,
    pub outcome: Result<T, ProviderError>,
}

impl<T> Scripted<T> {
    pub fn ok(value: T, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            outcome: Ok(value),
        }
    }

    pub fn err(error: ProviderError, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            outcome: Err(error),
        }
    }
}

async fn play<T: Clone>(script: Option<&Scripted<T>>, missing: T) -> Result<T, ProviderError> {
    match script {
        Some(script) => {
            tokio::time::sleep(script.delay).await;
            script.outcome.clone()
        }
        None => Ok(missing),
    }
}

/// Playlist source serving one fixed playlist under the URL "playlist/known"
pub struct ScriptedPlaylist {
    pub name: String,
    pub tracks: Vec<Track>,
}

#[async_trait]
impl PlaylistSource for ScriptedPlaylist {
    async fn metadata(&self, playlist_url: &str) -> Result<PlaylistMetadata, ProviderError> {
        if playlist_url != "playlist/known" {
            return Err(ProviderError::NotFound(format!(
                "Playlist not found: {}",
                playlist_url
            )));
        }
        Ok(PlaylistMetadata {
            playlist_id: "known".to_string(),
            name: self.name.clone(),
            total_tracks: self.tracks.len() as u32,
            ..Default::default()
        })
    }

    async fn tracks(&self, playlist_url: &str) -> Result<(Vec<Track>, String), ProviderError> {
        self.metadata(playlist_url).await?;
        Ok((self.tracks.clone(), self.name.clone()))
    }
}

/// Tempo answers keyed by track id; unscripted tracks have no tempo
#[derive(Default)]
pub struct ScriptedTempo(pub HashMap<String, Scripted<Option<f64>>>);

#[async_trait]
impl TempoProvider for ScriptedTempo {
    async fn tempo(&self, track: &Track) -> Result<Option<f64>, ProviderError> {
        play(self.0.get(&track.track_id), None).await
    }
}

/// Lyrics keyed by track id; unscripted tracks have none
#[derive(Default)]
pub struct ScriptedLyrics(pub HashMap<String, Scripted<Option<String>>>);

#[async_trait]
impl LyricsProvider for ScriptedLyrics {
    async fn lyrics(&self, track: &Track) -> Result<Option<String>, ProviderError> {
        play(self.0.get(&track.track_id), None).await
    }
}

/// Sentiment keyed by lyrics text
#[derive(Default)]
pub struct ScriptedSentiment {
    pub scores: HashMap<String, Scripted<Option<f64>>>,
    pub setup_error: Option<ProviderError>,
}

#[async_trait]
impl SentimentModel for ScriptedSentiment {
    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        match &self.setup_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn score(&self, lyrics: &str) -> Result<LyricSentiment, ProviderError> {
        let score = play(self.scores.get(lyrics), None).await?;
        Ok(score.map(LyricSentiment::single).unwrap_or_default())
    }
}

pub fn track(id: &str, title: &str, artist: &str) -> Track {
    let mut track = Track::new(id, title);
    track.artists = vec![artist.to_string()];
    track.duration_ms = 200_000;
    track
}

pub fn three_tracks() -> Vec<Track> {
    vec![
        track("track1", "First Light", "Ana"),
        track("track2", "Second Wind", "Ben"),
        track("track3", "Third Rail", "Cy"),
    ]
}

/// Providers for the three-track playlist.
///
/// Completion order: track1 tempo, track2 tempo, track1 sentiment,
/// track3 tempo, track2 sentiment, track3 sentiment. When
/// `track2_lyrics_missing` is set, track2's sentiment fails.
pub fn three_track_providers(track2_lyrics_missing: bool) -> Providers {
    let tempo = ScriptedTempo(HashMap::from([
        ("track1".to_string(), Scripted::ok(Some(120.0), 10)),
        ("track2".to_string(), Scripted::ok(Some(95.5), 40)),
        ("track3".to_string(), Scripted::ok(Some(140.0), 100)),
    ]));

    let mut lyrics = HashMap::from([
        ("track1".to_string(), Scripted::ok(Some("sunny words".to_string()), 60)),
        ("track3".to_string(), Scripted::ok(Some("gloomy words".to_string()), 150)),
    ]);
    if !track2_lyrics_missing {
        lyrics.insert(
            "track2".to_string(),
            Scripted::ok(Some("plain words".to_string()), 120),
        );
    }

    let sentiment = ScriptedSentiment {
        scores: HashMap::from([
            ("sunny words".to_string(), Scripted::ok(Some(0.9), 10)),
            ("plain words".to_string(), Scripted::ok(Some(0.5), 10)),
            ("gloomy words".to_string(), Scripted::ok(Some(0.1), 10)),
        ]),
        setup_error: None,
    };

    Providers {
        playlists: Arc::new(ScriptedPlaylist {
            name: "Test Mix".to_string(),
            tracks: three_tracks(),
        }),
        tempo: Arc::new(tempo),
        lyrics: Arc::new(ScriptedLyrics(lyrics)),
        sentiment: Arc::new(sentiment),
    }
}

pub fn test_app(providers: Providers) -> Router {
    test_app_with(providers, ServerSettings::default())
}

pub fn test_app_with(providers: Providers, settings: ServerSettings) -> Router {
    build_router(AppState::new(providers, &settings))
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Start a job and return its id
pub async fn create_job(app: &Router, tracks: &[Track]) -> String {
    let response = post_json(
        app,
        "/api/process-features",
        &serde_json::json!({ "tracks": tracks, "playlist_name": "Test Mix" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Read a whole progress stream and decode its events
pub async fn read_stream(app: &Router, job_id: &str) -> Vec<ProgressEvent> {
    let response = get(app, &format!("/api/progress-stream/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = tokio::time::timeout(Duration::from_secs(10), response.into_body().collect())
        .await
        .expect("progress stream did not finish")
        .unwrap()
        .to_bytes();

    let mut decoder = SseDecoder::new();
    decoder
        .feed(&bytes)
        .into_iter()
        .map(|frame| {
            let event = frame.progress_event().unwrap();
            assert_eq!(frame.event.as_deref(), Some(event.event_type()));
            event
        })
        .collect()
}
