//! HTTP client for the songgraph server
//!
//! [`PlaylistApi`] is the seam the session drives; [`ApiClient`] is the
//! reqwest implementation, decoding the progress stream with
//! [`SseDecoder`].

use crate::error::ClientError;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use songgraph_common::api::{
    ErrorBody, PlaylistWithTracks, ProcessFeaturesRequest, ProcessFeaturesResponse,
};
use songgraph_common::sse::SseDecoder;
use songgraph_common::{ProgressEvent, Track};
use std::pin::Pin;
use tracing::{debug, warn};
use uuid::Uuid;

/// Progress events of one job, in emission order
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ProgressEvent, ClientError>> + Send>>;

#[async_trait]
pub trait PlaylistApi: Send + Sync {
    /// Metadata and track list, enrichment fields unresolved
    async fn playlist_with_tracks(&self, playlist_url: &str) -> Result<PlaylistWithTracks, ClientError>;

    /// Start an enrichment job; returns without waiting for it
    async fn create_job(&self, tracks: &[Track], playlist_name: &str) -> Result<Uuid, ClientError>;

    /// Open the progress channel of a job (full replay, then live)
    async fn subscribe(&self, job_id: Uuid) -> Result<EventStream, ClientError>;
}

/// reqwest-backed [`PlaylistApi`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("songgraph/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-success response into [`ClientError::Api`], preferring the
/// server's error body message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.to_string()
            } else {
                text
            }
        });
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PlaylistApi for ApiClient {
    async fn playlist_with_tracks(&self, playlist_url: &str) -> Result<PlaylistWithTracks, ClientError> {
        let response = self
            .http
            .get(self.url("/api/playlist-with-tracks"))
            .query(&[("playlist_url", playlist_url)])
            .send()
            .await?;
        let response = check(response).await?;
        response
            .json::<PlaylistWithTracks>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn create_job(&self, tracks: &[Track], playlist_name: &str) -> Result<Uuid, ClientError> {
        let request = ProcessFeaturesRequest {
            tracks: tracks.to_vec(),
            playlist_name: Some(playlist_name.to_string()),
        };
        let response = self
            .http
            .post(self.url("/api/process-features"))
            .json(&request)
            .send()
            .await?;
        let response = check(response).await?;
        let body = response
            .json::<ProcessFeaturesResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!(job_id = %body.job_id, "Enrichment job created");
        Ok(body.job_id)
    }

    async fn subscribe(&self, job_id: Uuid) -> Result<EventStream, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/progress-stream/{}", job_id)))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check(response).await?;
        debug!(job_id = %job_id, "Progress stream opened");

        let mut chunks = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ClientError::Transport(e.to_string()));
                        break;
                    }
                };
                for frame in decoder.feed(&chunk) {
                    match frame.progress_event() {
                        Ok(event) => {
                            yield Ok(event);
                        }
                        Err(e) => warn!(job_id = %job_id, "Skipping undecodable progress frame: {}", e),
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
