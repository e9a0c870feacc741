//! Job Orchestrator
//!
//! Creates jobs and drives them: one tempo task and one sentiment task per
//! track, bounded by two worker semaphores shared across all jobs. Results
//! are appended to the job's log as soon as each task finishes, so events
//! for different tracks interleave in completion order.

use crate::enrichment::{EnrichmentError, EnrichmentUnit};
use crate::error::{ApiError, ApiResult};
use crate::jobs::{Job, JobRegistry};
use songgraph_common::{Dimension, Resolution, Track, TrackUpdate};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Concurrency limits for enrichment tasks
#[derive(Debug, Clone, Copy)]
pub struct WorkerLimits {
    pub bpm_max_workers: usize,
    pub sentiment_max_workers: usize,
}

/// Creates and runs enrichment jobs
#[derive(Clone)]
pub struct JobOrchestrator {
    registry: JobRegistry,
    unit: Arc<EnrichmentUnit>,
    bpm_permits: Arc<Semaphore>,
    sentiment_permits: Arc<Semaphore>,
}

impl JobOrchestrator {
    pub fn new(registry: JobRegistry, unit: Arc<EnrichmentUnit>, limits: WorkerLimits) -> Self {
        Self {
            registry,
            unit,
            bpm_permits: Arc::new(Semaphore::new(limits.bpm_max_workers.max(1))),
            sentiment_permits: Arc::new(Semaphore::new(limits.sentiment_max_workers.max(1))),
        }
    }

    /// Register a job for `tracks` and start enriching it in the background.
    ///
    /// Returns as soon as the job is registered; the caller never waits on
    /// any provider.
    pub async fn create_job(&self, playlist_name: String, tracks: Vec<Track>) -> ApiResult<Uuid> {
        validate_tracks(&tracks)?;

        let job = Job::new(playlist_name, tracks);
        let job_id = job.id();
        self.registry.insert(job.clone()).await;
        info!(
            job_id = %job_id,
            playlist = %job.playlist_name(),
            tracks = job.total(),
            "Enrichment job created"
        );

        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(job).await });

        Ok(job_id)
    }

    async fn run(self, job: Arc<Job>) {
        let job_id = job.id();

        if let Err(e) = self.unit.ready().await {
            error!(job_id = %job_id, "Enrichment setup failed: {}", e);
            if job.fail(e.message()).is_err() {
                warn!(job_id = %job_id, "Job already finished before setup failure");
            }
            return;
        }

        let mut tasks = JoinSet::new();
        for track in job.tracks() {
            let track = Arc::new(track);
            tasks.spawn(resolve_tempo(
                job.clone(),
                self.unit.clone(),
                self.bpm_permits.clone(),
                track.clone(),
            ));
            tasks.spawn(resolve_sentiment(
                job.clone(),
                self.unit.clone(),
                self.sentiment_permits.clone(),
                track,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(job_id = %job_id, "Enrichment task aborted: {}", e);
            }
        }

        match job.complete() {
            Ok(()) => info!(job_id = %job_id, "Enrichment job complete"),
            Err(e) => warn!(job_id = %job_id, "{}", e),
        }
    }
}

/// Input errors are reported synchronously and never create a job
pub fn validate_tracks(tracks: &[Track]) -> ApiResult<()> {
    if tracks.is_empty() {
        return Err(ApiError::BadRequest("No tracks provided".to_string()));
    }
    let mut seen = HashSet::with_capacity(tracks.len());
    for track in tracks {
        if track.track_id.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Track {:?} has no track_id",
                track.title
            )));
        }
        if !seen.insert(track.track_id.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Duplicate track_id: {}",
                track.track_id
            )));
        }
    }
    Ok(())
}

/// Drop repeated listings of the same track, keeping the first occurrence
pub fn dedupe_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::with_capacity(tracks.len());
    let listed = tracks.len();
    let unique: Vec<Track> = tracks
        .into_iter()
        .filter(|track| seen.insert(track.track_id.clone()))
        .collect();
    if unique.len() < listed {
        debug!(
            listed,
            unique = unique.len(),
            "Dropped repeated playlist entries"
        );
    }
    unique
}

fn settle(
    job_id: Uuid,
    track_id: &str,
    dimension: Dimension,
    outcome: Result<Option<f64>, EnrichmentError>,
) -> Resolution<f64> {
    match outcome {
        Ok(value) => Resolution::Resolved(value),
        Err(e) => {
            warn!(job_id = %job_id, track_id = %track_id, ?dimension, "Enrichment failed: {}", e);
            Resolution::Failed(e.message())
        }
    }
}

async fn resolve_tempo(
    job: Arc<Job>,
    unit: Arc<EnrichmentUnit>,
    permits: Arc<Semaphore>,
    track: Arc<Track>,
) {
    let Ok(_permit) = permits.acquire_owned().await else {
        return;
    };
    let outcome = unit.resolve_tempo(&track).await;
    let value = settle(job.id(), &track.track_id, Dimension::Tempo, outcome);
    if let Err(e) = job.record_update(TrackUpdate::new(&track.track_id, Dimension::Tempo, value)) {
        warn!("{}", e);
    }
}

async fn resolve_sentiment(
    job: Arc<Job>,
    unit: Arc<EnrichmentUnit>,
    permits: Arc<Semaphore>,
    track: Arc<Track>,
) {
    let Ok(_permit) = permits.acquire_owned().await else {
        return;
    };
    let lyrics_job = job.clone();
    let outcome = unit
        .resolve_sentiment(&track, move || {
            if let Err(e) = lyrics_job.record_lyrics() {
                warn!("{}", e);
            }
        })
        .await;
    let (outcome, breakdown) = match outcome {
        Ok(scored) => (Ok(scored.score), Some(scored.breakdown)),
        Err(e) => (Err(e), None),
    };
    let value = settle(job.id(), &track.track_id, Dimension::Sentiment, outcome);
    let mut update = TrackUpdate::new(&track.track_id, Dimension::Sentiment, value);
    if let Some(breakdown) = breakdown {
        update = update.with_sentiment_breakdown(breakdown);
    }
    if let Err(e) = job.record_update(update) {
        warn!("{}", e);
    }
}
