//! Default HTTP platform client (OneBot-style action API).

use crate::error::{Error, Result};
use crate::platform::PlatformClient;
use anyhow::Context as _;
use serde_json::Value;

/// Calls a OneBot-compatible HTTP endpoint: one POST per action, JSON in,
/// `{"status": "ok", "data": ...}` envelope out.
pub struct OneBotClient {
    base_url: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

impl OneBotClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            access_token,
            http,
        })
    }

    /// Call one action and unwrap the response envelope.
    async fn call_action(&self, action: &str, params: Value) -> Result<Value> {
        let endpoint = format!("{}/{action}", self.base_url.trim_end_matches('/'));

        let mut request = self.http.post(&endpoint).json(&params);
        if let Some(token) = &self.access_token {
            request = request.header("authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let mut body = response.json::<Value>().await?;

        if !status.is_success() || body["status"].as_str() == Some("failed") {
            let message = body["message"]
                .as_str()
                .or_else(|| body["wording"].as_str())
                .unwrap_or("unknown error");
            tracing::warn!(%status, action, error = %message, "platform action failed");
            return Err(Error::Platform(format!("{action}: {message}")));
        }

        Ok(envelope_data(&mut body))
    }
}

/// Pull `data` out of a success envelope. A misbehaving endpoint may send
/// a non-object body even with a success status; that degrades to `Null`
/// (downstream decoding reports it as unusable) instead of panicking on
/// the key access.
fn envelope_data(body: &mut Value) -> Value {
    body.get_mut("data").map(Value::take).unwrap_or(Value::Null)
}

impl PlatformClient for OneBotClient {
    async fn get_forward_msg(&self, forward_id: &str) -> Result<Value> {
        self.call_action("get_forward_msg", serde_json::json!({ "id": forward_id }))
            .await
            .map_err(|error| {
                // The container may have expired upstream; callers treat this
                // as the request having nothing to analyze.
                Error::ForwardUnavailable(error.to_string())
            })
    }

    async fn get_msg(&self, message_id: &str) -> Result<Value> {
        self.call_action("get_msg", serde_json::json!({ "message_id": message_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_data_unwraps_the_data_key() {
        let mut body = json!({"status": "ok", "data": {"messages": []}});

        assert_eq!(envelope_data(&mut body), json!({"messages": []}));
    }

    #[test]
    fn non_object_envelope_degrades_to_null() {
        // A bare string body must not panic on the key access.
        let mut body = json!("ok");
        assert_eq!(envelope_data(&mut body), Value::Null);

        let mut body = json!(["not", "an", "envelope"]);
        assert_eq!(envelope_data(&mut body), Value::Null);
    }

    #[test]
    fn envelope_without_data_degrades_to_null() {
        let mut body = json!({"status": "ok"});

        assert_eq!(envelope_data(&mut body), Value::Null);
    }
}
