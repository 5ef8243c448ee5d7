//! Generation service boundary.
//!
//! The provider is an opaque asynchronous text call: prompt and image
//! locators in, raw text out. Retry and validation live in [`retry`]; the
//! default OpenAI-compatible HTTP client lives in [`openai`].

pub mod openai;
pub mod retry;

pub use openai::OpenAiGenerator;
pub use retry::{GenerationOutcome, RetryController};

use crate::error::Result;

/// An opaque text-generation service.
///
/// Implementations may fail with [`crate::Error::GenerationTransport`] for
/// network/protocol errors; an invalid-but-present answer is not an error
/// here — the retry controller judges that.
pub trait TextGenerator {
    fn generate(
        &self,
        prompt: &str,
        image_urls: &[String],
    ) -> impl Future<Output = Result<String>> + Send;
}
