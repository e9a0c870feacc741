//! songgraph-client library interface
//!
//! Consumes the songgraph server: loads a playlist, follows its
//! enrichment job over SSE and reconciles the stream into a view.

pub mod api;
pub mod config;
pub mod error;
pub mod projector;
pub mod reconciler;
pub mod render;
pub mod session;

pub use crate::error::ClientError;
pub use crate::projector::SentimentMode;
pub use crate::reconciler::{PlaylistView, Reconciler, SessionState};
pub use crate::session::Session;
