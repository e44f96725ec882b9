//! Request dispatcher.
//!
//! Orchestrates one question end to end:
//!
//! ```text
//! Idle -> Configured? -> CacheCheck -> [HIT: Done]
//!                                   -> [MISS: RateWait -> Dispatching -> [OK: CacheWrite -> Done]
//!                                                                     -> [ERR: Done]]
//! ```
//!
//! Every failure is converted into a [`DispatchResult::Fallback`]; nothing
//! propagates to the caller. There is no retry loop.
//!
//! The dispatcher owns the response cache and the rate limiter. Build one at
//! start and share it by reference (`Arc<Dispatcher>`).

pub mod prompt;

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ResponseCache};
use crate::config::{Config, FallbackMessages};
use crate::providers::{CompletionProvider, CompletionRequest, ProviderError};
use crate::query::normalize;
use crate::rate_limit::RateLimiter;

pub use prompt::{truncate_chars, ContextExcerpt, PromptBuilder, CONTINUATION_MARKER};

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

/// Why a fallback answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No credential, or the provider rejected it (401/403).
    Unconfigured,
    /// The provider signalled quota exhaustion (429).
    RateLimited,
    /// Transport failure or any other non-success status.
    Network,
    /// A response arrived without an extractable answer.
    Unknown,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::RateLimited => "rate_limited",
            Self::Network => "network",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FallbackReason {
    /// Map a provider failure to a fallback category by code, never by text.
    pub fn classify(err: &ProviderError) -> Self {
        match err {
            ProviderError::Status {
                status: 401 | 403, ..
            } => Self::Unconfigured,
            ProviderError::Status { status: 429, .. } => Self::RateLimited,
            ProviderError::Status { .. }
            | ProviderError::Transport(_)
            | ProviderError::Timeout(_) => Self::Network,
            ProviderError::Api(_) | ProviderError::Decode(_) | ProviderError::NoCandidates => {
                Self::Unknown
            }
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Answered { text: String, origin: Origin },
    Fallback { text: String, reason: FallbackReason },
}

impl DispatchResult {
    /// Text to show the user, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            Self::Answered { text, .. } | Self::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Cache-fronted, rate-limited gateway to a completion provider.
pub struct Dispatcher {
    provider: Arc<dyn CompletionProvider>,
    cache: Mutex<ResponseCache>,
    limiter: Mutex<RateLimiter>,
    prompt: PromptBuilder,
    fallbacks: FallbackMessages,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("provider", &self.provider.name())
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        cache: ResponseCache,
        limiter: RateLimiter,
        prompt: PromptBuilder,
        fallbacks: FallbackMessages,
    ) -> Self {
        Self {
            provider,
            cache: Mutex::new(cache),
            limiter: Mutex::new(limiter),
            prompt,
            fallbacks,
        }
    }

    /// Wire a dispatcher from configuration around `provider`.
    pub fn from_config(config: &Config, provider: Arc<dyn CompletionProvider>) -> Self {
        Self::new(
            provider,
            ResponseCache::new(config.cache.ttl()),
            RateLimiter::new(config.rate_limit.min_spacing()),
            PromptBuilder::from_config(&config.assistant),
            config.assistant.fallback.clone(),
        )
    }

    /// Answer `query`, optionally steered by local `context` excerpts.
    pub async fn dispatch(
        &self,
        query: &str,
        context: Option<&[ContextExcerpt]>,
    ) -> DispatchResult {
        if !self.provider.is_configured() {
            debug!("Provider not configured, answering locally");
            return self.fallback(FallbackReason::Unconfigured);
        }

        let key = normalize(query);
        if let Some(text) = self.cache.lock().await.get(&key) {
            debug!(key = %key, "Cache hit");
            return DispatchResult::Answered {
                text,
                origin: Origin::Cache,
            };
        }
        debug!(key = %key, "Cache miss");

        self.limiter.lock().await.await_slot().await;

        let request = CompletionRequest {
            system: self.prompt.system_text(context),
            query: query.to_string(),
        };

        let completion = match self.provider.generate(&request).await {
            Ok(completion) => completion,
            Err(err) => {
                let reason = FallbackReason::classify(&err);
                warn!(
                    provider = %self.provider.name(),
                    reason = %reason,
                    error = %err,
                    "Completion failed, returning fallback"
                );
                return self.fallback(reason);
            }
        };

        if let Some(usage) = completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Completion usage"
            );
        }

        self.cache
            .lock()
            .await
            .put(key, completion.text.clone());

        DispatchResult::Answered {
            text: completion.text,
            origin: Origin::Network,
        }
    }

    /// Drop every cached answer.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
        info!("Response cache cleared");
    }

    /// Read-only view of the cache.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    fn fallback(&self, reason: FallbackReason) -> DispatchResult {
        let text = match reason {
            FallbackReason::Unconfigured => &self.fallbacks.unconfigured,
            FallbackReason::RateLimited => &self.fallbacks.rate_limited,
            FallbackReason::Network => &self.fallbacks.network,
            FallbackReason::Unknown => &self.fallbacks.unknown,
        };
        DispatchResult::Fallback {
            text: text.clone(),
            reason,
        }
    }
}
