//! Transcript building: forward nodes to speaker-attributed lines.

use crate::platform::ForwardNode;
use crate::segment::{self, Segment};

/// The flattened forward container: one line per node with content, plus
/// the image locators referenced by the inline `[imageN]` markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub lines: Vec<String>,
    pub image_urls: Vec<String>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.image_urls.is_empty()
    }

    /// The transcript as one block of text, one line per node.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Build a transcript from an ordered node sequence.
///
/// Image markers are 1-based and strictly increasing in document order; a
/// locator seen before reuses the index of its first occurrence so the
/// locator list stays deduplicated while markers keep their positional
/// correlation.
pub fn build_transcript(nodes: &[ForwardNode]) -> Transcript {
    let mut transcript = Transcript::default();

    for node in nodes {
        let mut buffer = String::new();

        for segment in segment::normalize_payload(&node.raw_payload) {
            match segment {
                Segment::Text(text) => buffer.push_str(&text),
                Segment::Image(locator) => {
                    let index = match transcript.image_urls.iter().position(|u| *u == locator) {
                        Some(existing) => existing + 1,
                        None => {
                            transcript.image_urls.push(locator);
                            transcript.image_urls.len()
                        }
                    };
                    buffer.push_str(&format!("[image{index}]"));
                }
            }
        }

        let rendered = buffer.trim();
        if !rendered.is_empty() {
            transcript
                .lines
                .push(format!("{}: {}", node.sender_label, rendered));
        }
    }

    tracing::debug!(
        lines = transcript.lines.len(),
        images = transcript.image_urls.len(),
        "built transcript"
    );

    transcript
}
