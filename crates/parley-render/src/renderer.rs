//! Streams a completion into a [`ChunkSink`].

use futures::StreamExt;
use parley_llm::{CompletionProvider, LlmError, Turn};
use tracing::{debug, error, info, warn};

use crate::sink::ChunkSink;
use crate::state::RenderState;

/// Drives one completion stream per call and emits chunks as soon as
/// [`RenderState`] releases them.
#[derive(Debug, Clone)]
pub struct StreamingRenderer<P> {
    provider: P,
}

impl<P: CompletionProvider> StreamingRenderer<P> {
    /// Create a renderer over `provider`.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Stream an answer for `turns` into `sink` and return the full answer,
    /// trimmed.
    ///
    /// Failures are reported to the sink once and yield an empty string:
    /// a missing key, a non-success status (with the response body), or a
    /// transport error or timeout at any point. Sink errors are logged and
    /// do not stop the stream.
    pub async fn render<S>(&self, turns: &[Turn], sink: &S) -> String
    where
        S: ChunkSink + ?Sized,
    {
        let mut deltas = match self.provider.stream_deltas(turns).await {
            Ok(deltas) => deltas,
            Err(e) => {
                report_failure(sink, &e).await;
                return String::new();
            },
        };

        let mut state = RenderState::new();
        let mut emitted: usize = 0;

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    for chunk in state.push_delta(&delta) {
                        deliver(sink, &chunk).await;
                        emitted = emitted.saturating_add(1);
                    }
                },
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "skipping stream event");
                },
                Err(e) => {
                    report_failure(sink, &e).await;
                    return String::new();
                },
            }
        }

        for chunk in state.finish() {
            deliver(sink, &chunk).await;
            emitted = emitted.saturating_add(1);
        }

        let answer = state.full_text().to_owned();
        info!(
            model = %self.provider.model(),
            chunks = emitted,
            chars = answer.chars().count(),
            "completion rendered"
        );
        answer
    }
}

async fn deliver<S: ChunkSink + ?Sized>(sink: &S, chunk: &str) {
    if let Err(e) = sink.send(chunk).await {
        warn!(error = %e, len = chunk.len(), "failed to deliver chunk");
    } else {
        debug!(len = chunk.len(), "delivered chunk");
    }
}

async fn report_failure<S: ChunkSink + ?Sized>(sink: &S, e: &LlmError) {
    error!(error = %e, "completion failed");
    deliver(sink, &failure_message(e)).await;
}

/// User-facing text for a failed completion.
#[must_use]
pub fn failure_message(e: &LlmError) -> String {
    match e {
        LlmError::ApiKeyNotConfigured { .. } => "Error: the completion API key is not set.".to_owned(),
        LlmError::InvalidApiKey(_) => "Error: the completion API key is not valid.".to_owned(),
        LlmError::Upstream { status, body } => {
            format!("Error from the completion API: {status} - {body}")
        },
        LlmError::Transport(detail) => {
            format!("Could not connect to the completion API: {detail}")
        },
        LlmError::Decode(detail) => format!("Could not read the completion response: {detail}"),
    }
}
