//! Where rendered chunks go.

use async_trait::async_trait;
use thiserror::Error;

/// Failure to deliver a chunk.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination rejected or failed the send.
    #[error("failed to deliver chunk: {0}")]
    Delivery(String),
}

/// Accepts discrete text chunks, one message each, in call order.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Deliver one chunk.
    async fn send(&self, chunk: &str) -> Result<(), SinkError>;
}

/// Records every chunk it receives.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct VecSink {
    chunks: std::sync::Mutex<Vec<String>>,
    fail: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl VecSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records chunks but reports every send as failed.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            chunks: std::sync::Mutex::default(),
            fail: true,
        }
    }

    /// Chunks received so far, in order.
    #[must_use]
    pub fn chunks(&self) -> Vec<String> {
        self.chunks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ChunkSink for VecSink {
    async fn send(&self, chunk: &str) -> Result<(), SinkError> {
        self.chunks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(chunk.to_owned());
        if self.fail {
            return Err(SinkError::Delivery("recording sink set to fail".to_owned()));
        }
        Ok(())
    }
}
