use std::time::Duration;

use dossier_core::config::DEFAULT_DISCOVERY_PLATFORMS;
use dossier_core::{parse_platform_list, AppConfig};

use crate::discovery::{handle_confidence, ConfidenceScorer};
use crate::retry::RetryPolicy;

/// Tuning for collection runs: call admission, retries, deadlines and the
/// per-run budgets that keep any one platform from swamping a dossier.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub retry: RetryPolicy,
    /// Calls admitted per endpoint per `rate_limit_window`.
    pub rate_limit_calls: usize,
    pub rate_limit_window: Duration,
    /// Upper bound on a single external call.
    pub call_timeout: Duration,
    /// Secondary operations / discovery lookups in flight within one run.
    pub max_concurrent_operations: usize,
    /// Platform runs in flight within one footprint collection.
    pub max_concurrent_platforms: usize,
    pub content_budget: usize,
    /// Items fetched from the primary content operation in Quick mode.
    pub quick_batch_size: usize,
    /// Leading content items whose comments are fetched.
    pub comment_items: usize,
    pub comments_per_item: usize,
    pub comment_sample_cap: usize,
    /// Leading content items whose transcripts are fetched.
    pub transcript_items: usize,
    /// Cap per social-graph direction.
    pub social_graph_cap: usize,
    pub quick_deadline: Duration,
    pub deep_deadline: Duration,
    /// Platforms checked by discovery when the caller names none.
    pub discovery_platforms: Vec<String>,
    /// Confidence assigned to each platform discovery finds.
    pub confidence_scorer: ConfidenceScorer,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            rate_limit_calls: 60,
            rate_limit_window: Duration::from_secs(60),
            call_timeout: Duration::from_secs(30),
            max_concurrent_operations: 4,
            max_concurrent_platforms: 3,
            content_budget: 200,
            quick_batch_size: 10,
            comment_items: 10,
            comments_per_item: 20,
            comment_sample_cap: 100,
            transcript_items: 5,
            social_graph_cap: 100,
            quick_deadline: Duration::from_secs(10),
            deep_deadline: Duration::from_secs(300),
            discovery_platforms: parse_platform_list(DEFAULT_DISCOVERY_PLATFORMS),
            confidence_scorer: handle_confidence,
        }
    }
}

impl CollectorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_backoff_base_ms),
            ),
            rate_limit_calls: config.rate_limit_calls,
            rate_limit_window: Duration::from_secs(config.rate_limit_window_secs),
            call_timeout: Duration::from_secs(config.request_timeout_secs),
            max_concurrent_operations: config.max_concurrent_operations,
            max_concurrent_platforms: config.max_concurrent_platforms,
            content_budget: config.content_budget,
            quick_deadline: Duration::from_secs(config.quick_deadline_secs),
            deep_deadline: Duration::from_secs(config.deep_deadline_secs),
            discovery_platforms: config.discovery_platforms.clone(),
            ..Self::default()
        }
    }
}
