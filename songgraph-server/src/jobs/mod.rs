//! Enrichment jobs and their progress channel
//!
//! A [`Job`] owns an append-only log of [`ProgressEvent`]s. Subscribers
//! replay the log from offset 0 and then follow it live; the log length is
//! published on a `watch` channel so appends wake every subscriber without
//! the job knowing who is listening.
//!
//! [`ProgressEvent`]: songgraph_common::ProgressEvent

mod job;
mod registry;

pub use job::{Job, JobClosed, ProgressStream};
pub use registry::{spawn_reaper, JobRegistry};
