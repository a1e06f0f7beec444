//! Request assembly and the text recorded for a user turn.

use parley_llm::{ContentPart, Role, Turn};

/// Recorded when a user turn has neither text nor image names.
pub const IMAGE_PLACEHOLDER: &str = "[image: the user sent an image]";

/// Build the turns for one completion request.
///
/// Order: the system prompt (only if non-blank), the prior turns as given,
/// then one multipart user turn holding the author-prefixed text and one
/// image part per non-empty data URI.
#[must_use]
pub fn assemble(
    system_prompt: &str,
    history: &[Turn],
    author: &str,
    user_text: &str,
    image_uris: &[String],
) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(history.len().saturating_add(2));

    if !system_prompt.trim().is_empty() {
        turns.push(Turn::system(system_prompt));
    }
    turns.extend(history.iter().cloned());
    turns.push(user_turn(author, user_text, image_uris));
    turns
}

fn user_turn(author: &str, user_text: &str, image_uris: &[String]) -> Turn {
    let images: Vec<&String> = image_uris.iter().filter(|uri| !uri.is_empty()).collect();
    let mut parts = Vec::with_capacity(images.len().saturating_add(1));

    let text = user_text.trim();
    if !text.is_empty() {
        parts.push(ContentPart::text(format!("{author}: {text}")));
    } else if !images.is_empty() {
        parts.push(ContentPart::text(format!(
            "{author} sent {} image(s).",
            images.len()
        )));
    }

    parts.extend(images.into_iter().map(|uri| ContentPart::image(uri.clone())));

    if parts.is_empty() {
        parts.push(ContentPart::text(format!("{author} sent an empty message.")));
    }

    Turn::multipart(Role::User, parts)
}

/// Text to store in the conversation for a user message: the trimmed text,
/// then one `[image: name]` line per attached image.
#[must_use]
pub fn memory_message(base_text: &str, image_names: &[String]) -> String {
    let mut lines = Vec::with_capacity(image_names.len().saturating_add(1));

    let text = base_text.trim();
    if !text.is_empty() {
        lines.push(text.to_owned());
    }
    lines.extend(image_names.iter().map(|name| format!("[image: {name}]")));

    if lines.is_empty() {
        return IMAGE_PLACEHOLDER.to_owned();
    }
    lines.join("\n")
}
