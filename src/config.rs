//! Reader configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the forward reader.
///
/// All fields have defaults so an empty config table works out of the box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ForwardReaderConfig {
    /// Analyze forward containers sent directly to the bot.
    pub enable_direct_analysis: bool,
    /// Analyze forward containers reached through a reply reference.
    pub enable_reply_analysis: bool,
    /// Acknowledgement sent while the analysis runs.
    pub waiting_message: String,
    /// Maximum transcript length in characters before truncation.
    pub max_transcript_chars: usize,
    /// Retries after the first failed validation (total calls = retries + 1).
    pub max_retries: u32,
    /// Pause between retry attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Reply sent when every attempt fails validation.
    pub fallback_reply: String,
    /// Custom prompt template. Must contain all four placeholders; a
    /// template missing any of them is rejected in favor of the default.
    pub prompt_template: Option<String>,
    /// User id allowed to run admin favor commands.
    pub admin_user_id: Option<String>,
}

impl Default for ForwardReaderConfig {
    fn default() -> Self {
        Self {
            enable_direct_analysis: false,
            enable_reply_analysis: true,
            waiting_message: "Hmm... let me take a look at this shared chat log.".into(),
            max_transcript_chars: 6000,
            max_retries: 2,
            retry_backoff_ms: 1500,
            fallback_reply: "Sorry, I couldn't put together a proper answer for this one.".into(),
            prompt_template: None,
            admin_user_id: None,
        }
    }
}

impl ForwardReaderConfig {
    /// Normalize the config: a custom template missing a required
    /// placeholder is dropped with a warning so assembly never silently
    /// produces a prompt with holes.
    pub fn validated(mut self) -> Self {
        if let Some(template) = &self.prompt_template
            && let Err(missing) = crate::prompt::check_template(template)
        {
            tracing::warn!(%missing, "custom prompt template rejected, using default");
            self.prompt_template = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_custom_template_falls_back_to_default() {
        let config = ForwardReaderConfig {
            prompt_template: Some("only {user_query} here".into()),
            ..Default::default()
        };

        assert!(config.validated().prompt_template.is_none());
    }

    #[test]
    fn complete_custom_template_is_kept() {
        let template = "{sender_name} {sender_id} {user_query} {chat_records}";
        let config = ForwardReaderConfig {
            prompt_template: Some(template.into()),
            ..Default::default()
        };

        assert_eq!(config.validated().prompt_template.as_deref(), Some(template));
    }
}
