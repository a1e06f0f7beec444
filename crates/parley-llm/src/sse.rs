//! Server-sent event decoding for streamed chat completions.
//!
//! The body is a sequence of lines. Blank lines, comments (`:`), and any
//! field other than `data:` are ignored. `data: [DONE]` ends the stream.
//! Every other `data:` payload is a JSON chunk whose text delta lives at
//! `choices[0].delta.content`, either as a string or as a list of typed
//! parts of which only `{"type": "text"}` parts carry text.

use serde::Deserialize;

use crate::error::{LlmError, LlmResult};

/// Sentinel payload that terminates the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// What one event line contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty text delta.
    Delta(String),
    /// The end-of-stream sentinel.
    Done,
    /// Nothing usable: blank line, comment, non-data field, or an event
    /// without text.
    Skip,
}

/// Decode a single event line.
///
/// # Errors
///
/// Returns [`LlmError::Decode`] when a `data:` payload is not valid JSON of
/// the expected shape. Callers log and skip it; the stream continues.
pub fn parse_event_line(line: &str) -> LlmResult<SseEvent> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };

    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(SseEvent::Done);
    }
    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| LlmError::Decode(format!("{e}: {data}")))?;

    match chunk.into_delta_text() {
        Some(text) if !text.is_empty() => Ok(SseEvent::Delta(text)),
        _ => Ok(SseEvent::Skip),
    }
}

/// Delta content as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DeltaContent {
    /// Plain string delta.
    Text(String),
    /// List of typed parts.
    Parts(Vec<DeltaPart>),
}

impl DeltaContent {
    /// Collapse to the text this delta contributes.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Parts(parts) => parts
                .into_iter()
                .filter_map(|part| match part {
                    DeltaPart::Text { text } => Some(text),
                    DeltaPart::Other => None,
                })
                .collect(),
        }
    }
}

/// One typed part of a list-shaped delta.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaPart {
    /// Text part.
    Text {
        /// The text; absent is treated as empty.
        #[serde(default)]
        text: String,
    },
    /// Any other part type (images, refusals, tool output, ...).
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<DeltaContent>,
}

impl StreamChunk {
    fn into_delta_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .delta?
            .content
            .map(DeltaContent::into_text)
    }
}

/// Splits a byte stream into lines.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character or
/// an event split across network reads is decoded whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and take every line they complete, without terminators.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(
                String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_owned(),
            );
        }
        lines
    }

    /// Take whatever is left after the body ended without a final newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&raw).trim_end_matches('\r').to_owned())
    }
}
