use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub provider_url: String,
    pub provider_api_key: Option<String>,
    pub platforms_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub min_request_interval_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub rate_limit_calls: usize,
    pub rate_limit_window_secs: u64,
    pub max_concurrent_platforms: usize,
    pub max_concurrent_operations: usize,
    pub content_budget: usize,
    pub quick_deadline_secs: u64,
    pub deep_deadline_secs: u64,
    pub discovery_platforms: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("provider_url", &self.provider_url)
            .field(
                "provider_api_key",
                &self.provider_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("platforms_path", &self.platforms_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("min_request_interval_ms", &self.min_request_interval_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("rate_limit_calls", &self.rate_limit_calls)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("max_concurrent_platforms", &self.max_concurrent_platforms)
            .field("max_concurrent_operations", &self.max_concurrent_operations)
            .field("content_budget", &self.content_budget)
            .field("quick_deadline_secs", &self.quick_deadline_secs)
            .field("deep_deadline_secs", &self.deep_deadline_secs)
            .field("discovery_platforms", &self.discovery_platforms)
            .finish()
    }
}
