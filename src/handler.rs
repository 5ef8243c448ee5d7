//! Event plumbing: turns one incoming message into an analysis run.
//!
//! The host dispatch hands every message to [`ForwardReader::handle_message`];
//! the reader decides whether the message targets a forward container
//! (directly or through a reply), runs the pipeline, and sends shaped text
//! back through the outbound channel. The host owns the transport envelope
//! and event propagation.

use crate::config::ForwardReaderConfig;
use crate::error::{Error, Result};
use crate::llm::{RetryController, TextGenerator};
use crate::platform::{self, PlatformClient};
use crate::prompt::{self, PromptContext};
use crate::transcript;
use crate::{ContentRef, IncomingMessage, OutboundReply, extract};
use std::time::Duration;
use tokio::sync::mpsc;

/// Query substituted when the user sent the forward (or the bare reply)
/// without asking anything.
const DEFAULT_QUERY: &str = "Please summarize this chat log.";

const EMPTY_CONTENT_REPLY: &str =
    "I couldn't extract any usable content from that forwarded chat log.";
const ANALYSIS_FAILED_REPLY: &str = "Sorry, analyzing that chat log failed.";

/// The forward reader. One instance serves all requests; each request is
/// processed by a single sequential task.
pub struct ForwardReader<P, G> {
    config: ForwardReaderConfig,
    platform: P,
    generator: G,
    reply_tx: mpsc::Sender<OutboundReply>,
}

impl<P: PlatformClient, G: TextGenerator> ForwardReader<P, G> {
    pub fn new(
        config: ForwardReaderConfig,
        platform: P,
        generator: G,
        reply_tx: mpsc::Sender<OutboundReply>,
    ) -> Self {
        Self {
            config: config.validated(),
            platform,
            generator,
            reply_tx,
        }
    }

    /// Handle one incoming message. Returns whether the message was
    /// consumed, so the host can stop propagating it to other handlers.
    #[tracing::instrument(skip(self, message), fields(message_id = %message.message_id, sender_id = %message.sender_id))]
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<bool> {
        let Some((forward_id, user_query)) = self.locate_forward(message).await else {
            return Ok(false);
        };

        tracing::info!(%forward_id, "analyzing forward container");

        // Acknowledge before the slow part so the user knows we're on it.
        self.send(OutboundReply::Quoted {
            reply_to: message.message_id.clone(),
            text: self.config.waiting_message.clone(),
        })
        .await;

        match self.analyze(message, &forward_id, &user_query).await {
            Ok(answer) => {
                self.send(OutboundReply::Text(answer)).await;
            }
            Err(Error::EmptyContent) => {
                tracing::info!(%forward_id, "forward container had no extractable content");
                self.send(OutboundReply::Text(EMPTY_CONTENT_REPLY.into()))
                    .await;
            }
            Err(error) => {
                // Full detail stays in the logs; the user gets a short
                // human-readable failure.
                tracing::error!(%forward_id, %error, "forward analysis failed");
                self.send(OutboundReply::Text(ANALYSIS_FAILED_REPLY.into()))
                    .await;
            }
        }

        Ok(true)
    }

    /// Find the forward container this message targets, if any, along with
    /// the query text to use. Direct containers win over reply references.
    async fn locate_forward(&self, message: &IncomingMessage) -> Option<(String, String)> {
        let mut user_query = message.text.trim().to_string();
        let mut reply_ref: Option<&str> = None;

        // An empty message that quotes something usually means "look at
        // the quoted content".
        let is_implicit_query = user_query.is_empty()
            && message
                .refs
                .iter()
                .any(|r| matches!(r, ContentRef::Reply { .. }));

        for content_ref in &message.refs {
            match content_ref {
                ContentRef::Forward { id } if self.config.enable_direct_analysis => {
                    if user_query.is_empty() {
                        user_query = DEFAULT_QUERY.into();
                    }
                    return Some((id.clone(), user_query));
                }
                ContentRef::Reply { message_id } => {
                    reply_ref.get_or_insert(message_id.as_str());
                }
                _ => {}
            }
        }

        if !self.config.enable_reply_analysis {
            return None;
        }
        let reply_id = reply_ref?;

        // Follow the reply to see whether it quotes a forward container. A
        // failed lookup is absorbed: this message simply isn't for us.
        let resolved = match self.platform.get_msg(reply_id).await {
            Ok(response) => platform::forward_id_from_reply(&response),
            Err(error) => {
                tracing::warn!(reply_id, %error, "failed to fetch replied-to message");
                None
            }
        };
        let forward_id = resolved?;

        if user_query.is_empty() || is_implicit_query {
            user_query = DEFAULT_QUERY.into();
        }
        Some((forward_id, user_query))
    }

    /// The pipeline: resolve, normalize, assemble, generate, extract.
    async fn analyze(
        &self,
        message: &IncomingMessage,
        forward_id: &str,
        user_query: &str,
    ) -> Result<String> {
        let response = self.platform.get_forward_msg(forward_id).await?;
        let nodes = platform::parse_forward_nodes(&response)?;
        let transcript = transcript::build_transcript(&nodes);

        if transcript.is_empty() {
            return Err(Error::EmptyContent);
        }

        let context = PromptContext {
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            user_query: user_query.to_string(),
            transcript_text: transcript.text(),
            image_urls: transcript.image_urls,
        };
        let base_prompt = prompt::assemble(&self.config, &context);

        tracing::info!(
            prompt_len = base_prompt.len(),
            images = context.image_urls.len(),
            "requesting generation"
        );

        let controller = RetryController::new(
            self.config.max_retries,
            Duration::from_millis(self.config.retry_backoff_ms),
            self.config.fallback_reply.clone(),
        );
        let outcome = controller
            .run(&self.generator, &base_prompt, &context.image_urls)
            .await?;

        if outcome.exhausted {
            // The fallback reply is already user-facing text.
            return Ok(outcome.text);
        }

        // Best-effort marker split; when the service ignored the marker,
        // degrade to stripping the reasoning block from the whole text.
        let answer = match extract::public_answer(&outcome.text) {
            Some(answer) if !answer.is_empty() => answer,
            _ => extract::strip_reasoning_block(&outcome.text),
        };

        Ok(answer)
    }

    async fn send(&self, reply: OutboundReply) {
        if let Err(error) = self.reply_tx.send(reply).await {
            tracing::error!(%error, "failed to send outbound reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned platform: forward containers and messages keyed by id.
    struct FakePlatform {
        forwards: HashMap<String, Value>,
        messages: HashMap<String, Value>,
    }

    impl FakePlatform {
        fn new() -> Self {
            Self {
                forwards: HashMap::new(),
                messages: HashMap::new(),
            }
        }

        fn with_forward(mut self, id: &str, response: Value) -> Self {
            self.forwards.insert(id.to_string(), response);
            self
        }

        fn with_message(mut self, id: &str, response: Value) -> Self {
            self.messages.insert(id.to_string(), response);
            self
        }
    }

    impl PlatformClient for FakePlatform {
        async fn get_forward_msg(&self, forward_id: &str) -> Result<Value> {
            self.forwards
                .get(forward_id)
                .cloned()
                .ok_or_else(|| Error::ForwardUnavailable("expired".into()))
        }

        async fn get_msg(&self, message_id: &str) -> Result<Value> {
            self.messages
                .get(message_id)
                .cloned()
                .ok_or_else(|| Error::Platform("no such message".into()))
        }
    }

    /// Generator returning a fixed valid response, recording each prompt.
    struct FixedGenerator {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedGenerator {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl TextGenerator for FixedGenerator {
        async fn generate(&self, prompt: &str, _image_urls: &[String]) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    fn incoming(text: &str, refs: Vec<ContentRef>) -> IncomingMessage {
        IncomingMessage {
            message_id: "m1".into(),
            text: text.into(),
            refs,
            sender_id: "1001".into(),
            sender_name: "alice".into(),
        }
    }

    fn forward_response() -> Value {
        json!({"messages": [
            {"sender": "A", "message": [{"type": "text", "data": {"text": "hi"}}]},
            {"sender": "B", "message": [{"type": "image", "data": {"url": "http://x/1.png"}}]},
        ]})
    }

    const VALID_RESPONSE: &str = "<reasoning>short log</reasoning>[answer] two people said hi";

    fn reader(
        config: ForwardReaderConfig,
        platform: FakePlatform,
        generator: FixedGenerator,
    ) -> (
        ForwardReader<FakePlatform, FixedGenerator>,
        mpsc::Receiver<OutboundReply>,
    ) {
        let (tx, rx) = mpsc::channel(8);
        (ForwardReader::new(config, platform, generator, tx), rx)
    }

    #[tokio::test]
    async fn direct_forward_is_analyzed_when_enabled() {
        let config = ForwardReaderConfig {
            enable_direct_analysis: true,
            ..Default::default()
        };
        let platform = FakePlatform::new().with_forward("F1", forward_response());
        let (reader, mut rx) = reader(config, platform, FixedGenerator::new(VALID_RESPONSE));

        let message = incoming("what is this?", vec![ContentRef::Forward { id: "F1".into() }]);
        let handled = reader.handle_message(&message).await.unwrap();

        assert!(handled);
        // Waiting message first, then the extracted public answer.
        assert!(matches!(rx.recv().await, Some(OutboundReply::Quoted { .. })));
        assert_eq!(
            rx.recv().await,
            Some(OutboundReply::Text("two people said hi".into()))
        );
    }

    #[tokio::test]
    async fn direct_forward_is_ignored_when_disabled() {
        let platform = FakePlatform::new().with_forward("F1", forward_response());
        let (reader, _rx) = reader(
            ForwardReaderConfig::default(),
            platform,
            FixedGenerator::new(VALID_RESPONSE),
        );

        let message = incoming("look", vec![ContentRef::Forward { id: "F1".into() }]);
        assert!(!reader.handle_message(&message).await.unwrap());
    }

    /// A reply quoting a forward resolves its container id and proceeds as
    /// if the user had sent the forward directly, defaulting the query.
    #[tokio::test]
    async fn reply_reference_resolves_forward_and_defaults_query() {
        let platform = FakePlatform::new()
            .with_forward("F1", forward_response())
            .with_message(
                "prev",
                json!({"message": [{"type": "forward", "data": {"id": "F1"}}]}),
            );
        let generator = FixedGenerator::new(VALID_RESPONSE);
        let (reader, mut rx) = reader(ForwardReaderConfig::default(), platform, generator);

        let message = incoming("", vec![ContentRef::Reply { message_id: "prev".into() }]);
        let handled = reader.handle_message(&message).await.unwrap();

        assert!(handled);
        let _waiting = rx.recv().await;
        let _answer = rx.recv().await;
        assert!(reader.generator.last_prompt().contains(DEFAULT_QUERY));
    }

    #[tokio::test]
    async fn reply_lookup_failure_is_absorbed() {
        let platform = FakePlatform::new(); // get_msg will fail
        let (reader, _rx) = reader(
            ForwardReaderConfig::default(),
            platform,
            FixedGenerator::new(VALID_RESPONSE),
        );

        let message = incoming("", vec![ContentRef::Reply { message_id: "gone".into() }]);
        assert!(!reader.handle_message(&message).await.unwrap());
    }

    #[tokio::test]
    async fn empty_container_tells_the_user_nothing_was_extractable() {
        let config = ForwardReaderConfig {
            enable_direct_analysis: true,
            ..Default::default()
        };
        let platform = FakePlatform::new().with_forward(
            "F1",
            json!({"messages": [{"sender": "A", "message": []}]}),
        );
        let (reader, mut rx) = reader(config, platform, FixedGenerator::new(VALID_RESPONSE));

        let message = incoming("look", vec![ContentRef::Forward { id: "F1".into() }]);
        reader.handle_message(&message).await.unwrap();

        let _waiting = rx.recv().await;
        assert_eq!(
            rx.recv().await,
            Some(OutboundReply::Text(EMPTY_CONTENT_REPLY.into()))
        );
    }

    #[tokio::test]
    async fn unavailable_forward_reports_a_short_failure() {
        let config = ForwardReaderConfig {
            enable_direct_analysis: true,
            ..Default::default()
        };
        let (reader, mut rx) = reader(
            config,
            FakePlatform::new(), // get_forward_msg will fail
            FixedGenerator::new(VALID_RESPONSE),
        );

        let message = incoming("look", vec![ContentRef::Forward { id: "F1".into() }]);
        reader.handle_message(&message).await.unwrap();

        let _waiting = rx.recv().await;
        assert_eq!(
            rx.recv().await,
            Some(OutboundReply::Text(ANALYSIS_FAILED_REPLY.into()))
        );
    }

    #[tokio::test]
    async fn message_without_forward_or_reply_is_not_handled() {
        let (reader, _rx) = reader(
            ForwardReaderConfig::default(),
            FakePlatform::new(),
            FixedGenerator::new(VALID_RESPONSE),
        );

        let message = incoming("just chatting", vec![ContentRef::Other]);
        assert!(!reader.handle_message(&message).await.unwrap());
    }

    /// When the service ignores the answer marker, the reasoning block is
    /// stripped from the accepted text instead.
    #[tokio::test]
    async fn missing_marker_degrades_to_reasoning_strip() {
        let config = ForwardReaderConfig {
            enable_direct_analysis: true,
            ..Default::default()
        };
        let platform = FakePlatform::new().with_forward("F1", forward_response());
        let generator =
            FixedGenerator::new("<reasoning>thinking</reasoning>\nthe plain answer");
        let (reader, mut rx) = reader(config, platform, generator);

        let message = incoming("look", vec![ContentRef::Forward { id: "F1".into() }]);
        reader.handle_message(&message).await.unwrap();

        let _waiting = rx.recv().await;
        assert_eq!(
            rx.recv().await,
            Some(OutboundReply::Text("the plain answer".into()))
        );
    }
}
