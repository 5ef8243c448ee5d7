//! OpenAI-compatible chat-completions generator.

use crate::error::{Error, Result};
use crate::llm::TextGenerator;
use anyhow::Context as _;
use serde_json::Value;

/// Posts a single-turn chat completion with the prompt as a text part and
/// each image locator as an `image_url` part.
pub struct OpenAiGenerator {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    /// `base_url` is the provider root (e.g. `https://api.openai.com`);
    /// a trailing `/v1` is tolerated since many OpenAI-compatible
    /// gateways hand out their base URL in that form.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            http,
        })
    }

    fn build_body(&self, prompt: &str, image_urls: &[String]) -> Value {
        let mut parts = vec![serde_json::json!({"type": "text", "text": prompt})];
        for url in image_urls {
            parts.push(serde_json::json!({
                "type": "image_url",
                "image_url": {"url": url},
            }));
        }

        serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": parts}],
        })
    }
}

impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, image_urls: &[String]) -> Result<String> {
        let endpoint = completions_endpoint(&self.base_url);
        let body = self.build_body(prompt, image_urls);

        let response = self
            .http
            .post(&endpoint)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|error| Error::GenerationTransport(error.to_string()))?;

        let status = response.status();
        let response_body = response
            .json::<Value>()
            .await
            .map_err(|error| Error::GenerationTransport(error.to_string()))?;

        if !status.is_success() {
            let message = response_body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            tracing::warn!(%status, model = %self.model, error = %message, "generation provider returned error");
            return Err(Error::GenerationTransport(format!("{status}: {message}")));
        }

        Ok(extract_completion_text(&response_body))
    }
}

/// Build the chat-completions endpoint, deduplicating a `/v1` the caller
/// already baked into the base URL.
fn completions_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}/v1/chat/completions")
}

/// Pull the assistant text out of a completion response, tolerating both
/// the plain-string and content-parts shapes.
fn extract_completion_text(body: &Value) -> String {
    if let Some(text) = body["choices"][0]["message"]["content"].as_str() {
        return text.to_string();
    }

    let Some(parts) = body["choices"][0]["message"]["content"].as_array() else {
        return String::new();
    };

    parts
        .iter()
        .filter_map(|part| {
            if part["type"].as_str() == Some("text") {
                part["text"].as_str()
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
