//! Deciding whether a guild message gets an answer, and what text it sends.

/// Facts about an incoming message relevant to triggering.
#[derive(Debug, Clone)]
pub struct MessageFacts<'a> {
    /// Raw message content.
    pub content: &'a str,
    /// Whether the bot is mentioned.
    pub mentions_bot: bool,
    /// The replied-to message, if this is a reply.
    pub reply_to: Option<RepliedMessage<'a>>,
}

/// The message a reply points at.
#[derive(Debug, Clone)]
pub struct RepliedMessage<'a> {
    /// Whether the bot wrote it.
    pub by_bot: bool,
    /// Display name of its author.
    pub author: &'a str,
    /// Its content.
    pub content: &'a str,
}

/// Why the bot is answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Mentioned or keyword-matched in a fresh message.
    Direct,
    /// A triggered reply to one of the bot's own messages.
    ReplyToBot,
    /// A triggered reply to someone else's message.
    ReplyToOther {
        /// Display name of the replied-to author.
        original_author: String,
        /// Replied-to content.
        original_content: String,
    },
}

impl Trigger {
    /// Text to record and send for this message.
    ///
    /// `body` is the message text with the bot mention removed and any
    /// inlined documents appended.
    #[must_use]
    pub fn user_text(&self, author: &str, body: &str) -> String {
        match self {
            Self::Direct | Self::ReplyToBot => body.to_owned(),
            Self::ReplyToOther {
                original_author,
                original_content,
            } => combined_prompt(original_author, original_content, author, body),
        }
    }
}

/// Decide whether to answer.
///
/// Fresh messages are answered when the bot is mentioned or a keyword
/// matches. Replies need the same, and then distinguish replies to the bot
/// from replies to other people. `keywords` must be lowercase; an empty list
/// disables keyword matching.
#[must_use]
pub fn decide(facts: &MessageFacts<'_>, keywords: &[String]) -> Option<Trigger> {
    let triggered = facts.mentions_bot || contains_keyword(facts.content, keywords);
    if !triggered {
        return None;
    }
    match &facts.reply_to {
        None => Some(Trigger::Direct),
        Some(replied) if replied.by_bot => Some(Trigger::ReplyToBot),
        Some(replied) => Some(Trigger::ReplyToOther {
            original_author: replied.author.to_owned(),
            original_content: replied.content.to_owned(),
        }),
    }
}

/// Case-insensitive substring match against lowercase keywords.
#[must_use]
pub fn contains_keyword(content: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let lower = content.to_lowercase();
    keywords
        .iter()
        .any(|kw| !kw.is_empty() && lower.contains(kw.as_str()))
}

/// Remove `<@id>` and `<@!id>` mentions of the bot and trim.
#[must_use]
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{bot_id}>"), "")
        .replace(&format!("<@!{bot_id}>"), "")
        .trim()
        .to_owned()
}

/// Prompt for a reply to someone else's message.
#[must_use]
pub fn combined_prompt(
    original_author: &str,
    original_content: &str,
    author: &str,
    text: &str,
) -> String {
    format!("Original message from {original_author}: {original_content}\nReply from {author}: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts<'a>(content: &'a str, mentions_bot: bool, reply_to: Option<RepliedMessage<'a>>) -> MessageFacts<'a> {
        MessageFacts {
            content,
            mentions_bot,
            reply_to,
        }
    }

    #[test]
    fn mention_triggers_direct() {
        assert_eq!(decide(&facts("<@1> hi", true, None), &[]), Some(Trigger::Direct));
    }

    #[test]
    fn plain_message_is_ignored() {
        assert_eq!(decide(&facts("hello all", false, None), &[]), None);
    }

    #[test]
    fn keyword_triggers_case_insensitively() {
        let keywords = vec!["parley".to_owned()];
        assert_eq!(
            decide(&facts("Hey PARLEY, what's up", false, None), &keywords),
            Some(Trigger::Direct)
        );
    }

    #[test]
    fn untriggered_reply_is_ignored() {
        let replied = RepliedMessage {
            by_bot: true,
            author: "Parley",
            content: "earlier answer",
        };
        assert_eq!(decide(&facts("thanks", false, Some(replied)), &[]), None);
    }

    #[test]
    fn reply_to_bot() {
        let replied = RepliedMessage {
            by_bot: true,
            author: "Parley",
            content: "earlier answer",
        };
        let trigger = decide(&facts("<@1> more?", true, Some(replied)), &[]).unwrap();
        assert_eq!(trigger, Trigger::ReplyToBot);
        assert_eq!(trigger.user_text("Ana", "more?"), "more?");
    }

    #[test]
    fn reply_to_other_builds_combined_prompt() {
        let replied = RepliedMessage {
            by_bot: false,
            author: "Bo",
            content: "the sky is green",
        };
        let trigger = decide(&facts("<@1> is that true?", true, Some(replied)), &[]).unwrap();
        assert_eq!(
            trigger.user_text("Ana", "is that true?"),
            "Original message from Bo: the sky is green\nReply from Ana: is that true?"
        );
    }

    #[test]
    fn empty_keyword_list_matches_nothing() {
        assert!(!contains_keyword("anything", &[]));
        assert!(!contains_keyword("anything", &[String::new()]));
    }

    #[test]
    fn strips_both_mention_forms() {
        assert_eq!(strip_mention("<@42> hi <@!42>", 42), "hi");
        assert_eq!(strip_mention("<@43> hi", 42), "<@43> hi");
    }
}
