#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Shared state behind the Parley relay.
//!
//! - [`ConversationStore`]: each user's last few turns, persisted to a JSON
//!   file after every change.
//! - [`AttachmentEncoder`]: turns image attachments into `data:` URIs,
//!   remembering recent ones in an [`ImageCache`].
//!
//! Both are meant to be created once and shared behind an `Arc`.

mod attachment;
mod cache;
mod conversation;
mod error;

pub use attachment::{
    AttachmentDescriptor, AttachmentEncoder, AttachmentReader, DEFAULT_MAX_ATTACHMENT_BYTES,
    FALLBACK_MIME, data_uri, guess_mime_from_filename,
};
pub use cache::{DEFAULT_CACHE_CAPACITY, ImageCache};
pub use conversation::{
    ConversationRecord, ConversationStore, DEFAULT_MAX_TURNS, normalize_user_content,
};
pub use error::{AttachmentError, MemoryError, MemoryResult};
