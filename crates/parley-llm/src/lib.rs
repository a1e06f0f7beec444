#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Streaming chat-completion client for Parley.
//!
//! Sends a list of [`Turn`]s to an OpenAI-compatible endpoint with
//! `stream: true` and yields the text deltas as they arrive.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use parley_llm::prelude::*;
//!
//! # async fn example() -> LlmResult<()> {
//! let client = CompletionClient::new(
//!     "https://api.openai.com/v1/chat/completions",
//!     Some("sk-..."),
//!     "gpt-4o",
//! );
//! let mut deltas = client.stream_deltas(&[Turn::user("Ana: hello")]).await?;
//! while let Some(delta) = deltas.next().await {
//!     print!("{}", delta?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod prelude;

mod error;
mod openai_compat;
mod provider;
pub mod sse;
mod types;

pub use error::{LlmError, LlmResult};
pub use openai_compat::{CompletionClient, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT};
pub use provider::{CompletionProvider, DeltaStream};
pub use types::{ContentPart, ImageUrl, Role, Turn, TurnContent};
