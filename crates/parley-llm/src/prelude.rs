//! Prelude module - commonly used types for convenient import.
//!
//! Use `use parley_llm::prelude::*;` to import all essential types.

// Errors
pub use crate::{LlmError, LlmResult};

// Provider trait and client
pub use crate::{CompletionClient, CompletionProvider, DeltaStream};

// Conversation types
pub use crate::{ContentPart, ImageUrl, Role, Turn, TurnContent};
