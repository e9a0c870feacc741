//! Process-wide job table and the expired-job reaper

use super::{Job, ProgressStream};
use crate::error::{ApiError, ApiResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Registry of live and recently finished jobs
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Arc<Job>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Arc<Job>) {
        self.jobs.write().await.insert(job.id(), job);
    }

    pub async fn get(&self, job_id: Uuid) -> Option<Arc<Job>> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Look up a job by its textual id; malformed ids are simply unknown
    pub async fn find(&self, job_id: &str) -> ApiResult<Arc<Job>> {
        let id = Uuid::parse_str(job_id)
            .map_err(|_| ApiError::NotFound(format!("Job not found: {}", job_id)))?;
        self.get(id)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))
    }

    /// Open the progress channel of a job
    pub async fn subscribe(&self, job_id: &str) -> ApiResult<ProgressStream> {
        let job = self.find(job_id).await?;
        debug!(job_id = %job.id(), "Progress subscription opened");
        Ok(job.subscribe())
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Jobs not yet in a terminal state
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| !job.state().is_terminal())
            .count()
    }

    /// Remove jobs that have been terminal for longer than `ttl`
    pub async fn reap_expired(&self, ttl: Duration) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.terminal_for().map_or(true, |age| age <= ttl));
        before - jobs.len()
    }
}

/// Periodically evict expired jobs
pub fn spawn_reaper(registry: JobRegistry, interval: Duration, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = registry.reap_expired(ttl).await;
            if removed > 0 {
                info!(removed, "Reaped expired jobs");
            }
        }
    })
}
