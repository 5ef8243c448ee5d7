//! Validated generation with bounded retries.
//!
//! The controller walks PENDING -> VALIDATING -> {ACCEPTED, RETRYING,
//! EXHAUSTED}. Validation failure is never an error: each failed attempt
//! rebuilds the corrected prompt from the *base* prompt (corrections are
//! never stacked, so the prompt cannot grow across retries), waits out the
//! backoff, and tries again. Only a transport failure from the generator
//! propagates to the caller.

use crate::error::Result;
use crate::llm::TextGenerator;
use crate::prompt::REASONING_OPEN_TAG;
use std::time::Duration;

/// Appended to the base prompt after a failed validation. Names the exact
/// two failure classes so the service knows what to correct.
const CORRECTION_NOTICE: &str = "\n\nIMPORTANT: your previous reply was rejected. \
It was either empty, or it did not follow the mandated response format. \
Reply with non-empty text and include the <reasoning>...</reasoning> block \
followed by the [answer] marker exactly as instructed.";

/// Terminal result of a retry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Accepted text, or the configured fallback when exhausted.
    pub text: String,
    /// Generation calls made (1-based).
    pub attempts: u32,
    /// True when every attempt failed validation.
    pub exhausted: bool,
}

/// Drives one prompt through the generation service until it validates.
#[derive(Debug, Clone)]
pub struct RetryController {
    max_retries: u32,
    backoff: Duration,
    fallback_reply: String,
}

impl RetryController {
    pub fn new(max_retries: u32, backoff: Duration, fallback_reply: impl Into<String>) -> Self {
        Self {
            max_retries,
            backoff,
            fallback_reply: fallback_reply.into(),
        }
    }

    /// Run the retry loop: at most `max_retries + 1` generation calls.
    pub async fn run<G: TextGenerator>(
        &self,
        generator: &G,
        base_prompt: &str,
        image_urls: &[String],
    ) -> Result<GenerationOutcome> {
        // The format check is armed only when the base prompt actually
        // mandates the tag; a custom template without it validates on
        // non-emptiness alone.
        let required_marker = base_prompt
            .contains(REASONING_OPEN_TAG)
            .then_some(REASONING_OPEN_TAG);

        let mut prompt = base_prompt.to_string();

        for attempt in 0..=self.max_retries {
            let response = generator.generate(&prompt, image_urls).await?;

            match validate(&response, required_marker) {
                Ok(()) => {
                    tracing::info!(attempt, response_len = response.len(), "response accepted");
                    return Ok(GenerationOutcome {
                        text: response,
                        attempts: attempt + 1,
                        exhausted: false,
                    });
                }
                Err(reason) => {
                    tracing::warn!(attempt, %reason, "response failed validation");

                    if attempt < self.max_retries {
                        // Fresh correction off the base prompt, never cumulative.
                        prompt = format!("{base_prompt}{CORRECTION_NOTICE}");
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }

        tracing::warn!(
            max_retries = self.max_retries,
            "all attempts failed validation, using fallback reply"
        );
        Ok(GenerationOutcome {
            text: self.fallback_reply.clone(),
            attempts: self.max_retries + 1,
            exhausted: true,
        })
    }
}

/// The validation predicate: non-blank, and carrying the mandated opening
/// tag when one is declared. Presence is checked as a substring only — the
/// contract is intentionally loose, closure is not verified.
fn validate(response: &str, required_marker: Option<&str>) -> std::result::Result<(), &'static str> {
    if response.trim().is_empty() {
        return Err("empty response");
    }

    if let Some(marker) = required_marker
        && !response.contains(marker)
    {
        return Err("missing required format marker");
    }

    Ok(())
}
