//! Chat-platform wire boundary.
//!
//! The platform API is an opaque remote call returning loosely-typed JSON;
//! this module owns the trait plus the pure decode helpers that turn those
//! values into forward nodes. The default HTTP client lives in
//! [`onebot`].

pub mod onebot;

pub use onebot::OneBotClient;

use crate::error::{Error, Result};
use serde_json::Value;

/// Resolves forward containers and prior messages on the chat platform.
pub trait PlatformClient {
    /// Resolve a forward-container id to its node list payload.
    fn get_forward_msg(
        &self,
        forward_id: &str,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// Fetch a prior message by id (used to follow reply references).
    fn get_msg(&self, message_id: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// One entry in a forwarded-message container: who sent it, and the raw
/// content payload in whatever shape the platform chose.
#[derive(Debug, Clone)]
pub struct ForwardNode {
    pub sender_label: String,
    pub raw_payload: Value,
}

/// Decode a `get_forward_msg` response into forward nodes.
///
/// Absence of the `messages` key is fatal for the request — there is
/// nothing meaningful to analyze.
pub fn parse_forward_nodes(response: &Value) -> Result<Vec<ForwardNode>> {
    let Some(messages) = response["messages"].as_array() else {
        return Err(Error::ForwardUnavailable(
            "response has no messages list".into(),
        ));
    };

    let nodes = messages
        .iter()
        .map(|node| ForwardNode {
            sender_label: sender_label(node),
            raw_payload: node_payload(node),
        })
        .collect();

    Ok(nodes)
}

/// Extract the sender label from a node, tolerating both a bare string and
/// the nested sender object used by newer platform versions.
fn sender_label(node: &Value) -> String {
    if let Some(label) = node["sender"].as_str() {
        return label.to_string();
    }

    node["sender"]["nickname"]
        .as_str()
        .or_else(|| node["sender"]["card"].as_str())
        .unwrap_or("unknown")
        .to_string()
}

/// The node content key varies by platform version: `message` or `content`.
fn node_payload(node: &Value) -> Value {
    if !node["message"].is_null() {
        node["message"].clone()
    } else {
        node["content"].clone()
    }
}

/// Scan a `get_msg` response for a forward segment and return its
/// container id, if any.
pub fn forward_id_from_reply(response: &Value) -> Option<String> {
    let segments = response["message"].as_array()?;

    segments
        .iter()
        .find(|segment| segment["type"].as_str() == Some("forward"))
        .and_then(|segment| segment["data"]["id"].as_str())
        .map(str::to_string)
}
