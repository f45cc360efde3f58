//! Decoder for streamed chat-completion bodies
//!
//! The service sends server-sent events, one JSON chunk per `data:` line,
//! and ends with `data: [DONE]`. The decoder is fed raw body bytes in
//! whatever pieces the transport delivers them and yields
//! [`StreamEvent`]s. After the first terminal event it yields nothing.

use crate::error::CirError;
use crate::providers::base::StreamEvent;
use bytes::{Buf, BytesMut};
use serde::Deserialize;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Incremental decoder for a chat-completion event stream
#[derive(Debug, Default)]
pub struct CompletionStreamDecoder {
    buffer: BytesMut,
    finished: bool,
}

impl CompletionStreamDecoder {
    /// Create a decoder with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next piece of the body
    ///
    /// Only complete lines are decoded; a trailing partial line (including
    /// a split UTF-8 sequence) waits for the next piece.
    pub fn feed(&mut self, piece: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.buffer.extend_from_slice(piece);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            self.decode_bytes(&line, &mut events);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Flush at end of body
    ///
    /// Decodes any unterminated last line, then ends the stream with
    /// `Done` if the body never carried a terminal event.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            self.decode_bytes(&rest, &mut events);
        }
        if !self.finished {
            tracing::debug!("Stream body ended without sentinel");
            self.push_terminal(StreamEvent::Done, &mut events);
        }
        events
    }

    fn decode_bytes(&mut self, raw: &[u8], events: &mut Vec<StreamEvent>) {
        match std::str::from_utf8(raw) {
            Ok(line) => self.decode_line(line, events),
            Err(e) => {
                tracing::error!("Stream event is not valid UTF-8: {}", e);
                self.push_terminal(
                    StreamEvent::Error(CirError::Protocol(format!(
                        "stream event is not valid UTF-8: {}",
                        e
                    ))),
                    events,
                );
            }
        }
    }

    fn decode_line(&mut self, raw: &str, events: &mut Vec<StreamEvent>) {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with(':') {
            return;
        }

        let payload = match line.strip_prefix("data:") {
            Some(data) => data.trim(),
            None if is_other_sse_field(line) => return,
            None => line.trim(),
        };

        if payload == DONE_SENTINEL {
            self.push_terminal(StreamEvent::Done, events);
            return;
        }

        let chunk: CompletionChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::error!("Undecodable stream event: {}", e);
                self.push_terminal(
                    StreamEvent::Error(CirError::Protocol(format!(
                        "undecodable stream event: {}",
                        e
                    ))),
                    events,
                );
                return;
            }
        };

        if let Some(error) = chunk.error {
            let message = match error.kind {
                Some(kind) => format!("{} ({})", error.message, kind),
                None => error.message,
            };
            tracing::error!("Service reported error: {}", message);
            self.push_terminal(StreamEvent::Error(CirError::Protocol(message)), events);
            return;
        }

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                events.push(StreamEvent::Chunk(content));
            }
            if let Some(reason) = choice.finish_reason {
                tracing::debug!("Stream finished: {}", reason);
                self.push_terminal(StreamEvent::Done, events);
                return;
            }
        }
    }

    fn push_terminal(&mut self, event: StreamEvent, events: &mut Vec<StreamEvent>) {
        self.finished = true;
        events.push(event);
    }
}

fn is_other_sse_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
}
