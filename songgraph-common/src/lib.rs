//! # SongGraph Common Library
//!
//! Shared code for the SongGraph server and client including:
//! - Track wire model and per-field enrichment state
//! - Progress event types streamed over SSE
//! - API request/response types
//! - Configuration loading
//! - SSE encoding and decoding helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod track;

pub use error::{Error, Result};
pub use events::{ProgressEvent, Stage, StageProgress};
pub use track::{
    Dimension, PlaylistMetadata, Resolution, SentimentBreakdown, Track, TrackUpdate,
};
