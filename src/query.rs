//! Query normalization.
//!
//! Two questions that differ only in case or whitespace density share one
//! cache key, so `"  Body   Structure "` and `"body structure"` hit the same
//! cached answer.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalize a free-text query into a cache key.
///
/// Lowercases, trims both ends and collapses internal whitespace runs to a
/// single space. Total: every input yields a key, including the empty string.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    WHITESPACE_RUN_RE
        .replace_all(lowered.trim(), " ")
        .into_owned()
}
