//! Turning Discord attachments into prompt material.

use async_trait::async_trait;
use parley_memory::{AttachmentDescriptor, AttachmentEncoder, AttachmentError, AttachmentReader};
use serenity::model::channel::Attachment;
use tracing::{debug, warn};

/// Reads a Discord attachment through its CDN URL.
pub struct DiscordAttachment<'a>(pub &'a Attachment);

#[async_trait]
impl AttachmentReader for DiscordAttachment<'_> {
    async fn read(&self) -> Result<Vec<u8>, AttachmentError> {
        self.0
            .download()
            .await
            .map_err(|e| AttachmentError::Read(e.to_string()))
    }
}

/// Describe a Discord attachment for the encoder.
#[must_use]
pub fn descriptor(attachment: &Attachment) -> AttachmentDescriptor {
    AttachmentDescriptor {
        url: attachment.url.clone(),
        declared_size: Some(u64::from(attachment.size)),
        declared_mime: attachment.content_type.clone(),
        filename: attachment.filename.clone(),
    }
}

/// Images found on a message.
#[derive(Debug, Default)]
pub struct EncodedImages {
    /// `data:` URIs, in attachment order.
    pub uris: Vec<String>,
    /// Matching filenames, for the conversation record.
    pub names: Vec<String>,
}

/// Encode every image attachment. Failures are skipped.
pub async fn encode_images(encoder: &AttachmentEncoder, attachments: &[Attachment]) -> EncodedImages {
    let mut images = EncodedImages::default();
    for attachment in attachments {
        let desc = descriptor(attachment);
        if !desc.is_image() {
            continue;
        }
        if let Some(uri) = encoder.encode(&desc, &DiscordAttachment(attachment)).await {
            let name = if attachment.filename.trim().is_empty() {
                "image".to_owned()
            } else {
                attachment.filename.clone()
            };
            images.uris.push(uri);
            images.names.push(name);
        }
    }
    images
}

/// Whether an attachment is a plain-text document we inline.
#[must_use]
pub fn is_text_document(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

/// Format inlined document text for the user message.
#[must_use]
pub fn document_block(filename: &str, text: &str) -> String {
    format!("\n\n[file {filename}]:\n{text}")
}

/// Download `.txt` attachments and return the text to append to the
/// message. Other document types are ignored.
pub async fn read_documents(attachments: &[Attachment], max_bytes: u64) -> String {
    let mut appended = String::new();
    for attachment in attachments {
        if !is_text_document(&attachment.filename) {
            if !descriptor(attachment).is_image() {
                debug!(filename = %attachment.filename, "ignoring unsupported attachment");
            }
            continue;
        }
        if u64::from(attachment.size) > max_bytes {
            warn!(
                filename = %attachment.filename,
                size = attachment.size,
                "text attachment over size limit, skipping"
            );
            continue;
        }

        let bytes = match attachment.download().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(filename = %attachment.filename, error = %e, "failed to download text attachment");
                continue;
            },
        };
        if let Some(block) = document_from_bytes(&attachment.filename, &bytes, max_bytes) {
            appended.push_str(&block);
        }
    }
    appended
}

/// Turn downloaded document bytes into a [`document_block`].
///
/// `None` when the download exceeds `max_bytes` or the text is blank.
#[must_use]
pub fn document_from_bytes(filename: &str, bytes: &[u8], max_bytes: u64) -> Option<String> {
    let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if size > max_bytes {
        warn!(filename = %filename, size, limit = max_bytes, "downloaded text attachment over size limit, skipping");
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        return None;
    }
    Some(document_block(filename, &text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_document_detection() {
        assert!(is_text_document("notes.txt"));
        assert!(is_text_document("NOTES.TXT"));
        assert!(!is_text_document("report.docx"));
        assert!(!is_text_document("txt"));
    }

    #[test]
    fn oversized_download_is_skipped() {
        assert_eq!(document_from_bytes("big.txt", b"0123456789", 4), None);
        assert_eq!(
            document_from_bytes("ok.txt", b"0123", 4).as_deref(),
            Some("\n\n[file ok.txt]:\n0123")
        );
    }

    #[test]
    fn blank_download_is_skipped() {
        assert_eq!(document_from_bytes("empty.txt", b"  \n", 1024), None);
    }

    #[test]
    fn document_block_format() {
        assert_eq!(
            document_block("a.txt", "line"),
            "\n\n[file a.txt]:\nline"
        );
    }
}
