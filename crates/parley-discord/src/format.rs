//! Making rendered chunks safe to post on Discord.
//!
//! The renderer already cuts the answer at line and code-block boundaries,
//! so most chunks go out unchanged. Two things still need care: mass
//! mentions in model output, and the 2000-char message limit for long
//! lines or large code blocks.

/// Discord's maximum message content length, in characters.
pub const DISCORD_MAX_LEN: usize = 2000;

/// Target piece size, leaving headroom for code fence continuations.
const TARGET_CHUNK_LEN: usize = 1900;

/// Neutralise `@everyone` and `@here`, and close a dangling code fence.
#[must_use]
pub fn sanitize_for_discord(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '@' {
            out.push(ch);
            continue;
        }

        let mut word = String::new();
        while let Some(&next) = chars.peek() {
            if !next.is_alphabetic() {
                break;
            }
            word.push(next);
            chars.next();
        }

        out.push('@');
        if word == "everyone" || word == "here" {
            out.push('\u{200B}');
        }
        out.push_str(&word);
    }

    if !out.matches("```").count().is_multiple_of(2) {
        out.push_str("\n```");
    }
    out
}

/// Split `text` into pieces of at most `max_len` characters.
///
/// Cuts prefer a paragraph break, then a newline, then a hard cut on a char
/// boundary. A piece that ends inside a code block closes it, and the next
/// piece re-opens it with the same language tag.
#[must_use]
pub fn chunk_discord(text: &str, max_len: usize) -> Vec<String> {
    let max_len = if max_len == 0 {
        TARGET_CHUNK_LEN
    } else {
        max_len.min(DISCORD_MAX_LEN)
    };

    if text.chars().count() <= max_len {
        return vec![text.to_owned()];
    }

    let mut pieces = Vec::new();
    let mut remaining = text;
    let mut open_lang: Option<String> = None;

    while !remaining.is_empty() {
        let prefix = open_lang
            .as_ref()
            .map(|lang| format!("```{lang}\n"))
            .unwrap_or_default();
        // Room for the prefix and a closing "\n```".
        let budget = max_len
            .saturating_sub(prefix.chars().count())
            .saturating_sub(4)
            .max(1);

        if remaining.chars().count() <= budget {
            pieces.push(format!("{prefix}{remaining}"));
            break;
        }

        let hard_cut = byte_offset_of_char(remaining, budget);
        let split_at = find_split_point(remaining, hard_cut, "\n\n")
            .or_else(|| find_split_point(remaining, hard_cut, "\n"))
            .unwrap_or(hard_cut);

        let (head, rest) = remaining.split_at(split_at);

        let mut lang = open_lang.clone();
        for line in head.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") {
                lang = match lang {
                    Some(_) => None,
                    None => Some(trimmed.trim_start_matches('`').trim().to_owned()),
                };
            }
        }

        let mut piece = prefix;
        piece.push_str(head.trim_end_matches('\n'));
        if lang.is_some() {
            piece.push_str("\n```");
        }
        pieces.push(piece);

        open_lang = lang;
        remaining = rest.trim_start_matches('\n');
    }

    pieces
}

/// Byte offset of the `n`th char of `s`, or `s.len()`.
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Search backwards from `boundary` for `delimiter`; the split lands just
/// after it. A split at offset 0 is useless and rejected.
fn find_split_point(text: &str, boundary: usize, delimiter: &str) -> Option<usize> {
    text.get(..boundary)?
        .rfind(delimiter)
        .map(|pos| pos.saturating_add(delimiter.len()))
        .filter(|&at| at > 0 && at < text.len())
}
