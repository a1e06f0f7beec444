//! Attachment-to-data-URI encoding with a read-through cache.

use async_trait::async_trait;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::cache::ImageCache;
use crate::error::AttachmentError;

/// Largest attachment that will be encoded (5 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

/// MIME type used when neither the declared type nor the filename helps.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// What the chat gateway tells us about an attachment before reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// Source URL, also the cache key.
    pub url: String,
    /// Size reported by the gateway, if any.
    pub declared_size: Option<u64>,
    /// Content type reported by the gateway, if any.
    pub declared_mime: Option<String>,
    /// Original filename.
    pub filename: String,
}

impl AttachmentDescriptor {
    /// MIME type: declared, else guessed from the extension, else octet-stream.
    #[must_use]
    pub fn resolved_mime(&self) -> String {
        self.declared_mime
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToString::to_string)
            .or_else(|| guess_mime_from_filename(&self.filename).map(ToString::to_string))
            .unwrap_or_else(|| FALLBACK_MIME.to_string())
    }

    /// Whether the resolved MIME type is an image type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.resolved_mime().starts_with("image/")
    }
}

/// Reads the bytes of one attachment.
#[async_trait]
pub trait AttachmentReader: Send + Sync {
    /// Fetch the attachment body.
    async fn read(&self) -> Result<Vec<u8>, AttachmentError>;
}

/// Guess a MIME type from a filename extension.
#[must_use]
pub fn guess_mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)?;

    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/vnd.microsoft.icon",
        "heic" => "image/heic",
        "avif" => "image/avif",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime)
}

/// Build a `data:` URI from a MIME type and raw bytes.
#[must_use]
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Turns image attachments into embeddable `data:` URIs.
#[derive(Debug)]
pub struct AttachmentEncoder {
    cache: ImageCache,
    max_bytes: u64,
}

impl AttachmentEncoder {
    /// Create an encoder with the given cache capacity and size ceiling.
    #[must_use]
    pub fn new(cache_capacity: usize, max_bytes: u64) -> Self {
        Self {
            cache: ImageCache::new(cache_capacity),
            max_bytes,
        }
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Encode an image attachment, or `None` when it is not an image, too
    /// large, or unreadable.
    ///
    /// A cache hit returns the stored URI without calling `reader`.
    pub async fn encode<R>(&self, descriptor: &AttachmentDescriptor, reader: &R) -> Option<String>
    where
        R: AttachmentReader + ?Sized,
    {
        match self.try_encode(descriptor, reader).await {
            Ok(uri) => Some(uri),
            Err(e) => {
                debug!(
                    url = %descriptor.url,
                    filename = %descriptor.filename,
                    reason = %e,
                    "attachment not encoded"
                );
                None
            },
        }
    }

    async fn try_encode<R>(
        &self,
        descriptor: &AttachmentDescriptor,
        reader: &R,
    ) -> Result<String, AttachmentError>
    where
        R: AttachmentReader + ?Sized,
    {
        if let Some(hit) = self.cache.get(&descriptor.url) {
            return Ok(hit);
        }

        let mime = descriptor.resolved_mime();
        if !mime.starts_with("image/") {
            return Err(AttachmentError::NotAnImage(mime));
        }

        if let Some(size) = descriptor.declared_size {
            self.check_size(size)?;
        }

        let bytes = reader.read().await.inspect_err(|e| {
            warn!(url = %descriptor.url, error = %e, "failed to read attachment");
        })?;
        self.check_size(u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;

        let uri = data_uri(&mime, &bytes);
        if let Some(evicted) = self.cache.insert(descriptor.url.clone(), uri.clone()) {
            debug!(url = %evicted, "evicted cached image");
        }
        Ok(uri)
    }

    fn check_size(&self, size: u64) -> Result<(), AttachmentError> {
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

impl Default for AttachmentEncoder {
    fn default() -> Self {
        Self::new(crate::cache::DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_ATTACHMENT_BYTES)
    }
}
