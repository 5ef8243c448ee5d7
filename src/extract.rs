//! Response extraction: isolating the public answer from raw model output.
//!
//! The delimiter contract is best-effort — the generation service is asked,
//! not guaranteed, to honor it — so the marker-absent case always has a
//! defined outcome instead of an assumed success.

use crate::prompt::{ANSWER_MARKER, REASONING_CLOSE_TAG, REASONING_OPEN_TAG};
use regex::Regex;
use std::sync::LazyLock;

static REASONING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?s){}.*?{}\s*",
        regex::escape(REASONING_OPEN_TAG),
        regex::escape(REASONING_CLOSE_TAG),
    );
    Regex::new(&pattern).expect("hardcoded regex")
});

/// Split on the first answer marker and return the trimmed remainder.
///
/// Returns `None` when the marker is absent so the caller can pick a
/// degraded fallback instead of silently receiving an empty string.
pub fn public_answer(raw: &str) -> Option<String> {
    let (_, rest) = raw.split_once(ANSWER_MARKER)?;
    Some(rest.trim().to_string())
}

/// Post-hoc cleanup: remove the first reasoning block (non-greedy, single
/// pass) plus a trailing answer marker, leaving only the trimmed remainder.
pub fn strip_reasoning_block(raw: &str) -> String {
    let stripped = REASONING_BLOCK.replace(raw, "");
    stripped
        .trim_start_matches(ANSWER_MARKER)
        .trim()
        .to_string()
}
