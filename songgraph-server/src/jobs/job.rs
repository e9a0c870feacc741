//! Single enrichment job: merged track list plus progress log

use chrono::{DateTime, Utc};
use futures::Stream;
use songgraph_common::api::{JobSnapshot, JobState};
use songgraph_common::{Dimension, ProgressEvent, Stage, StageProgress, Track, TrackUpdate};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Live view of a job's progress log
pub type ProgressStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Append attempted after the job reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("job {0} already finished")]
pub struct JobClosed(pub Uuid);

#[derive(Debug)]
struct JobInner {
    state: JobState,
    tracks: Vec<Track>,
    log: Vec<ProgressEvent>,
    lyrics_fetched: usize,
    ended_at: Option<DateTime<Utc>>,
    ended_instant: Option<Instant>,
}

impl JobInner {
    fn done_count(&self, dimension: Dimension) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.resolution(dimension).is_settled())
            .count()
    }
}

/// One enrichment job
///
/// The log is guarded by a synchronous mutex held only for the duration of
/// an append; no provider call ever runs under it.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    playlist_name: String,
    created_at: DateTime<Utc>,
    inner: Mutex<JobInner>,
    log_len: watch::Sender<usize>,
}

impl Job {
    /// Create a running job whose log starts with the `tracks` stage event
    pub fn new(playlist_name: impl Into<String>, tracks: Vec<Track>) -> Arc<Self> {
        let playlist_name = playlist_name.into();
        let initial = ProgressEvent::Progress(
            StageProgress::new(Stage::Tracks, 0, tracks.len(), "Tracks loaded")
                .with_tracks(tracks.clone())
                .with_playlist_name(playlist_name.clone()),
        );
        let (log_len, _) = watch::channel(1);

        Arc::new(Self {
            id: Uuid::new_v4(),
            playlist_name,
            created_at: Utc::now(),
            inner: Mutex::new(JobInner {
                state: JobState::Running,
                tracks,
                log: vec![initial],
                lyrics_fetched: 0,
                ended_at: None,
                ended_instant: None,
            }),
            log_len,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    /// Current merged track list
    pub fn tracks(&self) -> Vec<Track> {
        self.lock().tracks.clone()
    }

    pub fn total(&self) -> usize {
        self.lock().tracks.len()
    }

    /// Events from `offset` to the current end of the log
    pub fn events_from(&self, offset: usize) -> Vec<ProgressEvent> {
        let inner = self.lock();
        inner.log.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Time since the job turned terminal
    pub fn terminal_for(&self) -> Option<Duration> {
        self.lock().ended_instant.map(|at| at.elapsed())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let inner = self.lock();
        JobSnapshot {
            job_id: self.id,
            state: inner.state,
            playlist_name: self.playlist_name.clone(),
            event_count: inner.log.len(),
            tracks: inner.tracks.clone(),
            created_at: self.created_at,
            ended_at: inner.ended_at,
        }
    }

    /// Record one resolved (track, dimension) pair.
    ///
    /// Appends the `track_update` event and the dimension's stage counter
    /// as one atomic step, so counters never run ahead of the updates.
    pub fn record_update(&self, update: TrackUpdate) -> Result<(), JobClosed> {
        let mut inner = self.open()?;

        if let Some(position) = inner
            .tracks
            .iter()
            .position(|t| t.track_id == update.track_id)
        {
            if let Some(merged) = inner.tracks[position].with_update(&update) {
                inner.tracks[position] = merged;
            }
        }

        let dimension = update.dimension();
        inner.log.push(ProgressEvent::track_update(update));

        if let Some(dimension) = dimension {
            let done = inner.done_count(dimension);
            let total = inner.tracks.len();
            let event = match dimension {
                Dimension::Tempo => ProgressEvent::progress(
                    Stage::AudioFeatures,
                    done,
                    total,
                    format!("Calculating BPM: {}/{}", done, total),
                ),
                Dimension::Sentiment => ProgressEvent::progress(
                    Stage::Sentiment,
                    done,
                    total,
                    format!("Analyzing sentiment: {}/{}", done, total),
                ),
            };
            inner.log.push(event);
        }

        self.publish(&inner);
        Ok(())
    }

    /// Record that lyrics were fetched for one more track
    pub fn record_lyrics(&self) -> Result<(), JobClosed> {
        let mut inner = self.open()?;
        inner.lyrics_fetched += 1;
        let total = inner.tracks.len();
        let current = inner.lyrics_fetched.min(total);
        inner.log.push(ProgressEvent::progress(
            Stage::Lyrics,
            current,
            total,
            format!("Fetching lyrics: {}/{}", current, total),
        ));
        self.publish(&inner);
        Ok(())
    }

    /// Append the terminal `complete` event
    pub fn complete(&self) -> Result<(), JobClosed> {
        let mut inner = self.open()?;
        let total = inner.tracks.len();
        let event = ProgressEvent::Progress(
            StageProgress::new(Stage::Complete, total, total, "Complete")
                .with_tracks(inner.tracks.clone())
                .with_playlist_name(self.playlist_name.clone()),
        );
        inner.log.push(event);
        Self::finish(&mut inner, JobState::Complete);
        self.publish(&inner);
        Ok(())
    }

    /// Append the terminal `error` event
    pub fn fail(&self, message: impl Into<String>) -> Result<(), JobClosed> {
        let message = message.into();
        let mut inner = self.open()?;
        let total = inner.tracks.len();
        let current = inner
            .done_count(Dimension::Tempo)
            .min(inner.done_count(Dimension::Sentiment));
        let event = ProgressEvent::Progress(
            StageProgress::new(Stage::Error, current, total, format!("Error: {}", message))
                .with_error(message)
                .with_tracks(inner.tracks.clone())
                .with_playlist_name(self.playlist_name.clone()),
        );
        inner.log.push(event);
        Self::finish(&mut inner, JobState::Error);
        self.publish(&inner);
        Ok(())
    }

    /// Replay the log from the start, then follow live appends.
    ///
    /// The stream ends right after the terminal event. Dropping it has no
    /// effect on the job.
    pub fn subscribe(self: Arc<Self>) -> ProgressStream {
        let mut wake = self.log_len.subscribe();
        let job = self;

        Box::pin(async_stream::stream! {
            let mut offset = 0;
            'follow: loop {
                // Mark the current length as seen before reading, so an
                // append racing with the read still triggers `changed`.
                let _ = wake.borrow_and_update();
                let batch = job.events_from(offset);
                offset += batch.len();

                for event in batch {
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        break 'follow;
                    }
                }

                if wake.changed().await.is_err() {
                    break 'follow;
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, JobInner> {
        // A panic while holding the lock cannot leave the log half-written:
        // every append is a single push.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self) -> Result<MutexGuard<'_, JobInner>, JobClosed> {
        let inner = self.lock();
        if inner.state.is_terminal() {
            return Err(JobClosed(self.id));
        }
        Ok(inner)
    }

    fn finish(inner: &mut JobInner, state: JobState) {
        inner.state = state;
        inner.ended_at = Some(Utc::now());
        inner.ended_instant = Some(Instant::now());
    }

    fn publish(&self, inner: &JobInner) {
        self.log_len.send_replace(inner.log.len());
    }
}
