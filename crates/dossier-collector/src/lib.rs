//! Dossier collection: call admission and retry, provider capability
//! traits, the Quick/Deep orchestrator, cross-platform discovery, footprint
//! aggregation and the HTTP gateway provider.

pub mod aggregator;
pub mod config;
pub mod discovery;
mod dispatch;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod rate_limit;
pub mod resolver;
pub mod retry;

pub use aggregator::FootprintAggregator;
pub use config::CollectorConfig;
pub use discovery::{
    extract_links, handle_confidence, ConfidenceScorer, MentionMatcher, MENTION_CONFIDENCE,
};
pub use error::{CollectError, ProviderError};
pub use http::HttpProvider;
pub use orchestrator::{CollectionOrchestrator, DeepOptions};
pub use provider::{
    CommentFetcher, ContentFetcher, ContentProvider, DemographicsPredictor, ProfileFetcher,
    ProfileSearcher, ProviderRegistry, ProviderRegistryBuilder, ResourcePayload, SearchResults,
    TranscriptFetcher,
};
pub use rate_limit::{MinIntervalLimiter, RateLimitExceeded, RateLimiter};
pub use resolver::ResolvedIdentity;
pub use retry::{Retried, RetryError, RetryPolicy, Retryable};
