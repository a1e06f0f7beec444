//! Streaming client for OpenAI-compatible chat-completion endpoints.
//!
//! Works with the `OpenAI` API and with local servers that speak the same
//! protocol (LM Studio, Ollama, vLLM). Local endpoints do not need a key.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{LlmError, LlmResult};
use crate::provider::{CompletionProvider, DeltaStream};
use crate::sse::{LineBuffer, SseEvent, parse_event_line};
use crate::types::Turn;

/// Default completion budget per request.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default end-to-end request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for one chat-completion endpoint and model.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    endpoint_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    /// Create a client for `endpoint_url` (the full `.../chat/completions` URL).
    #[must_use]
    pub fn new(endpoint_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint_url: endpoint_url.to_string(),
            api_key: api_key.map(ToString::to_string),
            model: model.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout. It covers connecting and reading the whole body.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint this client posts to.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Build the request body.
    fn build_request(&self, turns: &[Turn]) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": turns,
            "max_tokens": self.max_tokens,
            "stream": true
        })
    }

    fn requires_key(&self) -> bool {
        self.api_key.as_ref().is_none_or(|k| k.trim().is_empty())
            && !is_local_url(&self.endpoint_url)
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_deltas(&self, turns: &[Turn]) -> LlmResult<DeltaStream> {
        if self.requires_key() {
            return Err(LlmError::ApiKeyNotConfigured {
                endpoint: self.endpoint_url.clone(),
            });
        }

        let request_body = self.build_request(turns);

        debug!(
            model = %self.model,
            endpoint = %self.endpoint_url,
            turns = turns.len(),
            "starting completion stream"
        );

        let mut request = self
            .client
            .post(&self.endpoint_url)
            .timeout(self.timeout)
            .header(ACCEPT, "text/event-stream");

        if let Some(api_key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let mut auth_value = HeaderValue::try_from(format!("Bearer {api_key}"))
                .map_err(|e| LlmError::InvalidApiKey(e.to_string()))?;
            auth_value.set_sensitive(true);
            request = request.header(AUTHORIZATION, auth_value);
        }

        let response = request.json(&request_body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "completion endpoint returned an error");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let stream = stream! {
            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::from(e));
                        return;
                    },
                };
                for line in lines.push(&chunk) {
                    match parse_event_line(&line) {
                        Ok(SseEvent::Delta(text)) => yield Ok(text),
                        Ok(SseEvent::Done) => return,
                        Ok(SseEvent::Skip) => {},
                        Err(e) => yield Err(e),
                    }
                }
            }

            // Body ended without a trailing newline.
            if let Some(line) = lines.finish() {
                match parse_event_line(&line) {
                    Ok(SseEvent::Delta(text)) => yield Ok(text),
                    Ok(SseEvent::Done | SseEvent::Skip) => {},
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Whether a URL points at this machine.
fn is_local_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
}
