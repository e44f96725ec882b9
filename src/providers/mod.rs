//! Completion providers.
//!
//! The dispatcher talks to a [`CompletionProvider`] and never to a vendor API
//! directly. Providers surface failures as structured [`ProviderError`]s so
//! callers match on status codes instead of message text.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GeminiAuth, GeminiProvider};

/// One outbound completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Instructional preamble plus the optional context block.
    pub system: String,
    /// The raw user question.
    pub query: String,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Structured provider failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection refused, DNS failure or any other send failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request exceeded the client timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A success status carrying an error object in the body.
    #[error("provider error: {0}")]
    Api(String),

    /// The body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The response had no extractable answer.
    #[error("no candidates in response")]
    NoCandidates,
}

impl ProviderError {
    /// Build a [`ProviderError::Status`], pulling a message out of a JSON
    /// `{"error": {"message": ...}}` body when there is one.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.trim().to_string());
        Self::Status { status, message }
    }

    /// HTTP status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Whether a credential is present. An unconfigured provider is never
    /// called.
    fn is_configured(&self) -> bool;

    /// Issue one completion call.
    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, ProviderError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}
