//! Crate error taxonomy.
//!
//! Segment-level anomalies (unexpected payload shapes) are absorbed where
//! they occur; only container-level absence and transport failures surface
//! here. Validation exhaustion is never an error — the retry controller
//! resolves it into the configured fallback reply.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The forward container could not be resolved or held no usable node
    /// list. Fatal for the request: there is nothing to analyze.
    #[error("forward content unavailable: {0}")]
    ForwardUnavailable(String),

    /// Normalization produced neither text nor images.
    #[error("no extractable content in forwarded messages")]
    EmptyContent,

    /// The generation service call itself failed (network/protocol), as
    /// opposed to returning an invalid-but-present answer.
    #[error("generation request failed: {0}")]
    GenerationTransport(String),

    /// A platform API call failed outside the forward-resolution path.
    #[error("platform api call failed: {0}")]
    Platform(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
