//! Error types for conversation storage and attachment encoding.

use thiserror::Error;

/// Errors from the conversation store.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The conversation file exists but could not be read.
    #[error("failed to read conversation file {path}: {source}")]
    Load {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The conversation file could not be written.
    #[error("failed to persist conversations to {path}: {source}")]
    Persist {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store could not be serialized.
    #[error("failed to serialize conversations: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for conversation store operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Why an attachment was not encoded.
///
/// Never surfaces past [`AttachmentEncoder::encode`](crate::AttachmentEncoder::encode),
/// which turns every variant into "no image".
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Declared or actual size is above the ceiling.
    #[error("attachment is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        /// Size in bytes.
        size: u64,
        /// Ceiling in bytes.
        limit: u64,
    },

    /// The attachment is not an image.
    #[error("attachment type {0} is not an image")]
    NotAnImage(String),

    /// Reading the attachment failed.
    #[error("failed to read attachment: {0}")]
    Read(String),
}
