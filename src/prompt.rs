//! Prompt assembly.
//!
//! Substitution is literal find-and-replace per placeholder, never format
//! interpolation: both the template and the transcript routinely contain
//! brace characters (JSON snippets, kaomoji) that must pass through
//! untouched.

use crate::config::ForwardReaderConfig;

pub const PLACEHOLDER_SENDER_NAME: &str = "{sender_name}";
pub const PLACEHOLDER_SENDER_ID: &str = "{sender_id}";
pub const PLACEHOLDER_USER_QUERY: &str = "{user_query}";
pub const PLACEHOLDER_CHAT_RECORDS: &str = "{chat_records}";

const ALL_PLACEHOLDERS: &[&str] = &[
    PLACEHOLDER_SENDER_NAME,
    PLACEHOLDER_SENDER_ID,
    PLACEHOLDER_USER_QUERY,
    PLACEHOLDER_CHAT_RECORDS,
];

/// Delimiters wrapped around the quoted transcript so the generation
/// service can unambiguously locate it inside the instructional template.
const RECORDS_OPEN: &str = "--- chat records start ---";
const RECORDS_CLOSE: &str = "--- chat records end ---";

const TRUNCATION_MARKER: &str = "\n[chat records truncated]";

/// The opening tag the response-format contract mandates. Its presence in
/// the assembled prompt is what arms the retry controller's format check.
pub const REASONING_OPEN_TAG: &str = "<reasoning>";
pub const REASONING_CLOSE_TAG: &str = "</reasoning>";
/// Boundary between the private reasoning block and the public answer.
pub const ANSWER_MARKER: &str = "[answer]";

const DEFAULT_TEMPLATE: &str = "\
The user {sender_name} (id {sender_id}) asked: '{user_query}'

Answer the question using only the chat records quoted below.
First think through the records inside a <reasoning>...</reasoning> block, \
then give your public answer after an [answer] marker. The reasoning block \
is private and will not be shown to the user.

{chat_records}";

/// Everything the assembler needs for one request. Constructed once,
/// immutable after assembly.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub sender_id: String,
    pub sender_name: String,
    pub user_query: String,
    pub transcript_text: String,
    pub image_urls: Vec<String>,
}

/// Verify a template contains every required placeholder. Returns the
/// first missing placeholder on failure.
pub fn check_template(template: &str) -> Result<(), &'static str> {
    for placeholder in ALL_PLACEHOLDERS {
        if !template.contains(placeholder) {
            return Err(placeholder);
        }
    }
    Ok(())
}

/// Assemble the final prompt: truncate and wrap the transcript, then
/// substitute each placeholder literally.
pub fn assemble(config: &ForwardReaderConfig, context: &PromptContext) -> String {
    let template = config.prompt_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);

    let records = truncate_transcript(&context.transcript_text, config.max_transcript_chars);
    let wrapped = format!("{RECORDS_OPEN}\n{records}\n{RECORDS_CLOSE}");

    template
        .replace(PLACEHOLDER_SENDER_NAME, &context.sender_name)
        .replace(PLACEHOLDER_SENDER_ID, &context.sender_id)
        .replace(PLACEHOLDER_USER_QUERY, &context.user_query)
        .replace(PLACEHOLDER_CHAT_RECORDS, &wrapped)
}

/// Bound the transcript to `max_chars` characters.
///
/// The truncation marker counts against the budget, so the result never
/// exceeds `max_chars` and re-applying the bound is a no-op.
pub fn truncate_transcript(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    let keep = max_chars.saturating_sub(marker_chars);
    let cut: String = text.chars().take(keep).collect();

    tracing::debug!(original_chars = char_count, max_chars, "truncated transcript");

    format!("{cut}{TRUNCATION_MARKER}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(transcript: &str) -> PromptContext {
        PromptContext {
            sender_id: "1001".into(),
            sender_name: "alice".into(),
            user_query: "what happened?".into(),
            transcript_text: transcript.into(),
            image_urls: Vec::new(),
        }
    }

    #[test]
    fn default_template_contains_all_placeholders() {
        assert!(check_template(DEFAULT_TEMPLATE).is_ok());
    }

    #[test]
    fn substitution_is_literal_even_with_braces_in_transcript() {
        let config = ForwardReaderConfig::default();
        let context = context(r#"A: sent {"json": true} and {not_a_placeholder}"#);

        let prompt = assemble(&config, &context);
        assert!(prompt.contains(r#"A: sent {"json": true} and {not_a_placeholder}"#));
        assert!(prompt.contains("alice"));
        assert!(prompt.contains("1001"));
        assert!(prompt.contains("what happened?"));
    }

    #[test]
    fn transcript_is_wrapped_in_delimiters() {
        let config = ForwardReaderConfig::default();
        let prompt = assemble(&config, &context("A: hi"));

        let open = prompt.find(RECORDS_OPEN).unwrap();
        let body = prompt.find("A: hi").unwrap();
        let close = prompt.find(RECORDS_CLOSE).unwrap();
        assert!(open < body && body < close);
    }

    #[test]
    fn truncation_is_idempotent() {
        let text = "x".repeat(500);

        let once = truncate_transcript(&text, 100);
        let twice = truncate_transcript(&once, 100);

        assert_eq!(once, twice);
        assert!(once.chars().count() <= 100);
        assert!(once.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn short_transcript_is_untouched() {
        assert_eq!(truncate_transcript("short", 100), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multibyte characters must not be split mid-codepoint.
        let text = "→".repeat(200);

        let truncated = truncate_transcript(&text, 50);
        assert!(truncated.chars().count() <= 50);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn default_template_arms_the_format_check() {
        let config = ForwardReaderConfig::default();
        let prompt = assemble(&config, &context("A: hi"));

        assert!(prompt.contains(REASONING_OPEN_TAG));
        assert!(prompt.contains(ANSWER_MARKER));
    }
}
