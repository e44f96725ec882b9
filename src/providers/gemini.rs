//! Gemini `generateContent` provider.
//!
//! Thinking model support: Gemini 2.5 models return parts tagged
//! `thought: true`. Those are filtered out and only the final non-thought text
//! is returned.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{GenerationConfig, ProviderConfig, SafetySetting};
use crate::error::{GuideError, Result};

use super::{Completion, CompletionProvider, CompletionRequest, ProviderError, Usage};

// ── Auth ─────────────────────────────────────────────────────────────────────

/// API key sent as the `?key=` query parameter.
pub struct GeminiAuth(String);

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GeminiAuth([REDACTED])")
    }
}

impl GeminiAuth {
    /// `None` for a missing or blank key.
    pub fn from_key(key: Option<&str>) -> Option<Self> {
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| Self(k.to_string()))
    }
}

// ── Provider ──────────────────────────────────────────────────────────────────

/// Provider that speaks the Gemini REST API directly.
pub struct GeminiProvider {
    auth: Option<GeminiAuth>,
    model: String,
    base_url: String,
    generation: GenerationConfig,
    safety: Vec<SafetySetting>,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("auth", &self.auth)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Build from provider config. A missing key still yields a provider; it
    /// just reports itself as unconfigured.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GuideError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            auth: GeminiAuth::from_key(config.api_key.as_deref()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation: config.generation.clone(),
            safety: config.safety.clone(),
            client,
        })
    }

    /// Build the `generateContent` request body.
    ///
    /// The preamble (with any context block) goes to `systemInstruction`; the
    /// user question is the single `user` turn. Generation parameters and
    /// safety thresholds are passed through as configured.
    pub fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let safety: Vec<Value> = self
            .safety
            .iter()
            .map(|s| json!({ "category": s.category, "threshold": s.threshold }))
            .collect();
        json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.query }]
            }],
            "generationConfig": {
                "temperature": self.generation.temperature,
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
                "maxOutputTokens": self.generation.max_output_tokens,
                "stopSequences": self.generation.stop_sequences
            },
            "safetySettings": safety
        })
    }

    /// Extract final answer text from a Gemini response.
    ///
    /// Parts tagged `"thought": true` are intermediate reasoning and are
    /// skipped. If only thought parts exist, their text is returned so the
    /// caller still gets an answer.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if !thought_parts.is_empty() {
            Some(thought_parts.join(""))
        } else {
            None
        }
    }

    /// Parse token usage from a Gemini response if available.
    fn extract_usage(response: &Value) -> Option<Usage> {
        let meta = response.get("usageMetadata")?;
        let prompt = u32::try_from(meta["promptTokenCount"].as_u64()?).ok()?;
        let completion = u32::try_from(meta["candidatesTokenCount"].as_u64()?).ok()?;
        Some(Usage::new(prompt, completion))
    }

    /// Interpret a decoded success body.
    fn parse_response(json: &Value) -> std::result::Result<Completion, ProviderError> {
        if let Some(message) = json["error"]["message"].as_str() {
            return Err(ProviderError::Api(message.to_string()));
        }
        let has_candidates = json["candidates"]
            .as_array()
            .is_some_and(|c| !c.is_empty());
        if !has_candidates {
            return Err(ProviderError::NoCandidates);
        }
        let text = Self::extract_text(json).ok_or(ProviderError::NoCandidates)?;
        let mut completion = Completion::text(text);
        if let Some(usage) = Self::extract_usage(json) {
            completion = completion.with_usage(usage);
        }
        Ok(completion)
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn is_configured(&self) -> bool {
        self.auth.is_some()
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, ProviderError> {
        let key = match &self.auth {
            Some(GeminiAuth(key)) => key.as_str(),
            None => {
                return Err(ProviderError::Status {
                    status: 401,
                    message: "no API key configured".into(),
                })
            }
        };
        let body = self.build_request_body(request);

        debug!(model = %self.model, "Gemini request");

        let response = self
            .client
            .post(self.api_url())
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &error_text));
        }

        // A body cut short by a timeout or reset is a transport failure, not a decode one.
        let bytes = response.bytes().await.map_err(transport_error)?;
        let json: Value =
            serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Self::parse_response(&json)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Transport(e.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
