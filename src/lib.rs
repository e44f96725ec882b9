//! guidedesk: a terminal browser and AI assistant for hierarchical markdown
//! documentation guides.
//!
//! The core is the request layer in [`dispatcher`]: questions are normalized
//! ([`query`]), answered from a TTL cache ([`cache`]) when possible, otherwise
//! forwarded through a single-slot rate limiter ([`rate_limit`]) to a
//! [`providers::CompletionProvider`]. Every failure becomes a typed fallback
//! answer.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod guide;
pub mod providers;
pub mod query;
pub mod rate_limit;

pub use cache::{CacheStats, ResponseCache};
pub use config::Config;
pub use dispatcher::{ContextExcerpt, DispatchResult, Dispatcher, FallbackReason, Origin};
pub use error::{GuideError, Result};
pub use guide::{GuideIndex, Section};
pub use providers::{CompletionProvider, GeminiProvider, ProviderError};
pub use query::normalize;
pub use rate_limit::RateLimiter;
