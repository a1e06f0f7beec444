//! Conversation turns as sent to the completion endpoint.
//!
//! The serde shapes match the chat-completions wire format, so a `Turn`
//! serializes directly into one entry of the request's `messages` array and
//! a text turn round-trips through the conversation file unchanged.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions prepended to the conversation.
    System,
    /// A chat participant.
    User,
    /// The model.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: TurnContent,
}

impl Turn {
    /// Create a user text turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create an assistant text turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a system text turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a multipart turn.
    #[must_use]
    pub fn multipart(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: TurnContent::Parts(parts),
        }
    }

    /// Get text content if this is a plain text turn.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text(s) => Some(s),
            TurnContent::Parts(_) => None,
        }
    }
}

/// Turn content: plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Plain text content.
    Text(String),
    /// Multi-part content (text + images).
    Parts(Vec<ContentPart>),
}

impl TurnContent {
    /// True when there is nothing to send: blank text or no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

/// A part of multi-part content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content.
    Text {
        /// The text.
        text: String,
    },
    /// Image given as a URI (usually a `data:` URI).
    ImageUrl {
        /// Image reference.
        image_url: ImageUrl,
    },
}

impl ContentPart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from a URI.
    pub fn image(uri: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: uri.into() },
        }
    }
}

/// Image reference inside an [`ContentPart::ImageUrl`] part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// The URI.
    pub url: String,
}
