//! Outbound prompt assembly.

use serde::{Deserialize, Serialize};

use crate::config::AssistantConfig;

/// Appended to an excerpt cut at the character budget.
pub const CONTINUATION_MARKER: &str = "...";

const CONTEXT_HEADER: &str = "Relevant content from the guide:";
const CONTEXT_FOOTER: &str = "Use this context to provide more specific and accurate answers.";

/// A snippet of local documentation used to steer the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextExcerpt {
    pub title: String,
    pub excerpt: String,
}

impl ContextExcerpt {
    pub fn new(title: impl Into<String>, excerpt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            excerpt: excerpt.into(),
        }
    }
}

/// Builds the instructional preamble plus context block.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    max_context_items: usize,
    excerpt_chars: usize,
}

impl PromptBuilder {
    pub fn new(system_prompt: impl Into<String>, max_context_items: usize, excerpt_chars: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_context_items,
            excerpt_chars,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            config.system_prompt.clone(),
            config.max_context_items,
            config.excerpt_chars,
        )
    }

    /// System text for one call: the preamble, then up to
    /// `max_context_items` numbered excerpts when context was supplied.
    pub fn system_text(&self, context: Option<&[ContextExcerpt]>) -> String {
        let mut out = self.system_prompt.clone();
        let items = match context {
            Some(items) if !items.is_empty() && self.max_context_items > 0 => items,
            _ => return out,
        };

        out.push_str("\n\n");
        out.push_str(CONTEXT_HEADER);
        out.push('\n');
        for (index, item) in items.iter().take(self.max_context_items).enumerate() {
            out.push_str(&format!(
                "\n{}. {}:\n{}\n",
                index + 1,
                item.title,
                truncate_chars(&item.excerpt, self.excerpt_chars)
            ));
        }
        out.push('\n');
        out.push_str(CONTEXT_FOOTER);
        out
    }
}

/// Cap `text` at `max_chars` characters, adding [`CONTINUATION_MARKER`] when
/// anything was cut. Counts chars, not bytes, so multi-byte text is never
/// split inside a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], CONTINUATION_MARKER),
        None => text.to_string(),
    }
}
