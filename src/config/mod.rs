//! Configuration for guidedesk.
//!
//! Loaded once at start from `~/.guidedesk/config.json` (or an explicit path)
//! and never re-read. Every section falls back to its defaults, and a missing
//! file yields [`Config::default`]. Credentials can also come from the
//! environment (see [`Config::apply_env_overrides`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GuideError, Result};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default Gemini REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an expert assistant for the documentation guide loaded in this browser.

Your role is to help users understand and navigate the guide's sections, its \
modeling rules and its editorial conventions.

Guidelines for responses:
1. Base answers on the guide's content and say when you are unsure.
2. Use clear, professional language.
3. Suggest relevant sections of the guide for more detail.
4. Give concrete examples when discussing modeling patterns.";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub assistant: AssistantConfig,
    pub guide: GuideConfig,
}

impl Config {
    /// `~/.guidedesk`, or `./.guidedesk` when no home directory is known.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".guidedesk")
    }

    /// Default config file location.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path` without consulting the environment.
    ///
    /// A missing file yields defaults; an unparsable one is an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => {
                let config: Self = serde_json::from_str(&data).map_err(|e| {
                    GuideError::Config(format!("invalid config {}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "Loaded config");
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fill gaps from the process environment.
    ///
    /// API key priority: config file → `GUIDEDESK_API_KEY` → `GEMINI_API_KEY`
    /// → `GOOGLE_API_KEY`. `GUIDEDESK_MODEL` and `GUIDEDESK_GUIDE_DIR`
    /// override the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self
            .provider
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            self.provider.api_key = non_empty("GUIDEDESK_API_KEY")
                .or_else(|| non_empty("GEMINI_API_KEY"))
                .or_else(|| non_empty("GOOGLE_API_KEY"));
        }
        if let Some(model) = non_empty("GUIDEDESK_MODEL") {
            self.provider.model = model;
        }
        if let Some(dir) = non_empty("GUIDEDESK_GUIDE_DIR") {
            self.guide.root = Some(PathBuf::from(dir));
        }
    }

    fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(GuideError::Config("provider.model must not be empty".into()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(GuideError::Config("cache.ttl_secs must be positive".into()));
        }
        if self.assistant.excerpt_chars == 0 {
            return Err(GuideError::Config(
                "assistant.excerpt_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Completion provider settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API credential. Absent or empty means the assistant runs in local mode.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Client-side request timeout.
    pub timeout_secs: u64,
    pub generation: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("generation", &self.generation)
            .field("safety", &self.safety)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            generation: GenerationConfig::default(),
            safety: SafetySetting::defaults(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Sampling parameters passed through to the provider untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 2048,
            stop_sequences: Vec::new(),
        }
    }
}

/// One content-safety threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    fn defaults() -> Vec<Self> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| Self {
            category: category.to_string(),
            threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        })
        .collect()
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 * 60 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Outbound call spacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub min_spacing_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: 1000,
        }
    }
}

impl RateLimitConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

/// Prompt assembly and fallback wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub system_prompt: String,
    /// Maximum context excerpts appended to the prompt.
    pub max_context_items: usize,
    /// Per-excerpt character budget.
    pub excerpt_chars: usize,
    pub fallback: FallbackMessages,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_context_items: 3,
            excerpt_chars: 500,
            fallback: FallbackMessages::default(),
        }
    }
}

/// Human-readable substitute answers, one per fallback reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackMessages {
    pub unconfigured: String,
    pub rate_limited: String,
    pub network: String,
    pub unknown: String,
}

impl Default for FallbackMessages {
    fn default() -> Self {
        Self {
            unconfigured: "I'm currently running in local mode without AI enhancement. \
                For the best experience, configure an API key."
                .to_string(),
            rate_limited: "I'm receiving too many requests right now. \
                Please wait a moment and try again."
                .to_string(),
            network: "I'm having trouble connecting to the AI service right now. \
                Please try again later or check your internet connection."
                .to_string(),
            unknown: "I'm not sure how to help with that specific question. \
                Try asking about concepts, modeling guidelines, or editorial practices \
                covered by the guide."
                .to_string(),
        }
    }
}

/// Guide location and search limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Directory holding `hierarchy.json` / `file-list.json` and the markdown.
    pub root: Option<PathBuf>,
    /// Queries shorter than this return no search results.
    pub search_min_chars: usize,
    pub max_search_results: usize,
    /// Sections gathered as context for a question.
    pub context_limit: usize,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            root: None,
            search_min_chars: 2,
            max_search_results: 20,
            context_limit: 3,
        }
    }
}
