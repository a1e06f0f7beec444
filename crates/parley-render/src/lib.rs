#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Incremental rendering of streamed completions for Parley.
//!
//! [`StreamingRenderer`] consumes the text deltas of one completion and
//! hands chunks to a [`ChunkSink`] as soon as they are safe to show: whole
//! lines outside code fences, and whole fenced blocks once they close.
//! [`RenderState`] is the sink-free core of that decision.

pub mod prompt;
mod renderer;
mod sink;
mod state;

pub use renderer::{StreamingRenderer, failure_message};
#[cfg(any(test, feature = "test-support"))]
pub use sink::VecSink;
pub use sink::{ChunkSink, SinkError};
pub use state::RenderState;
