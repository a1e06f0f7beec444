//! Completion provider trait.
//!
//! The renderer only needs a stream of text deltas for a list of turns;
//! anything that can produce one implements [`CompletionProvider`].

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::error::LlmResult;
use crate::types::Turn;

/// Boxed stream of text deltas.
///
/// Items are non-empty text fragments in arrival order. A recoverable `Err`
/// item (see [`LlmError::is_recoverable`](crate::LlmError::is_recoverable)) marks one undecodable event and
/// the stream continues; any other `Err` means the stream broke and nothing
/// follows it.
pub type DeltaStream = Pin<Box<dyn Stream<Item = LlmResult<String>> + Send>>;

/// Something that streams a chat completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model name sent with each request.
    fn model(&self) -> &str;

    /// Start a streamed completion for `turns`.
    ///
    /// Resolves once the response headers are in. Errors here (missing key,
    /// transport failure, non-success status) mean no deltas were produced.
    async fn stream_deltas(&self, turns: &[Turn]) -> LlmResult<DeltaStream>;
}

#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Arc<P> {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn stream_deltas(&self, turns: &[Turn]) -> LlmResult<DeltaStream> {
        (**self).stream_deltas(turns).await
    }
}
