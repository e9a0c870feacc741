//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE helpers: encoding [`ProgressEvent`]s into axum SSE events on
//! the server side, and an incremental frame decoder for the client side.

use crate::events::ProgressEvent;
use crate::Result;
use axum::response::sse::Event;

/// Encode a progress event as an SSE event named after its `type`
pub fn progress_to_sse(event: &ProgressEvent) -> Result<Event> {
    let json = serde_json::to_string(event)?;
    Ok(Event::default().event(event.event_type()).data(json))
}

/// One dispatched SSE frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined by `\n`
    pub data: String,
    /// `id:` field, if any
    pub id: Option<String>,
}

impl SseFrame {
    /// Decode the frame payload as a progress event
    pub fn progress_event(&self) -> Result<ProgressEvent> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// Incremental SSE decoder
///
/// Accepts arbitrary byte chunks (chunk boundaries may split lines or
/// UTF-8 sequences) and yields complete frames. Comment lines (`:`),
/// keep-alive text and frames without data are dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current: SseFrame,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            let frame = std::mem::take(&mut self.current);
            let had_data = std::mem::replace(&mut self.has_data, false);
            return had_data.then_some(frame);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.current.event = Some(value.to_string()),
            "id" => self.current.id = Some(value.to_string()),
            _ => {}
        }
        None
    }
}
