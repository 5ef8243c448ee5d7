//! forwardbot: analyzes merged-forward chat logs with an LLM.
//!
//! The host platform resolves a forward container to a loosely-typed node
//! list; this crate normalizes it into a flat transcript, assembles a
//! prompt, and drives the generation service through a validated retry
//! loop. Wire transport and event dispatch stay on the host's side of the
//! `PlatformClient` / `TextGenerator` traits.

pub mod config;
pub mod error;
pub mod extract;
pub mod favor;
pub mod handler;
pub mod llm;
pub mod logging;
pub mod platform;
pub mod prompt;
pub mod segment;
pub mod transcript;

pub use config::ForwardReaderConfig;
pub use error::{Error, Result};
pub use handler::ForwardReader;

/// A typed content reference inside an incoming message.
///
/// The host's message chain carries many segment kinds; the reader only
/// cares about forward containers and reply references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    /// A merged-forward container embedded directly in the message.
    Forward { id: String },
    /// A reply quoting a prior message by id.
    Reply { message_id: String },
    /// Anything else (plain text, emoji, mentions, ...). Ignored.
    Other,
}

/// One incoming message from the host dispatch, reduced to what the
/// reader needs: the free-text query, the content references, and the
/// sender identity.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: String,
    pub text: String,
    pub refs: Vec<ContentRef>,
    pub sender_id: String,
    pub sender_name: String,
}

/// Outbound text shaped by the reader; the host owns the transport envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundReply {
    Text(String),
    /// Text quoting the message it responds to.
    Quoted { reply_to: String, text: String },
}
