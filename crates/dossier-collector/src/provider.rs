//! Provider capability traits and the registry that maps platforms to
//! implementations.
//!
//! Each external capability is its own trait. A platform supports an
//! operation exactly when the [`ContentProvider`] hands back an
//! implementation for it; there is no lookup by method name at call time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dossier_core::{
    AccountRef, Comment, ContentItem, DemographicEstimate, ProfileRecord, Transcript,
};

use crate::error::ProviderError;

/// Output of one secondary fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ResourcePayload {
    Content(Vec<ContentItem>),
    Accounts(Vec<AccountRef>),
    Data(Value),
}

/// Result of a platform search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Account/channel matches.
    #[serde(default)]
    pub channels: Vec<ProfileRecord>,
    /// Content matches; their `author` may identify the account.
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch_profile(&self, handle: &str) -> Result<ProfileRecord, ProviderError>;
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// `key` is the handle or the internal account id, depending on the
    /// platform's content key.
    async fn fetch_content(
        &self,
        key: &str,
        params: &BTreeMap<String, Value>,
    ) -> Result<ResourcePayload, ProviderError>;
}

#[async_trait]
pub trait CommentFetcher: Send + Sync {
    async fn fetch_comments(
        &self,
        item_id: &str,
        count: usize,
    ) -> Result<Vec<Comment>, ProviderError>;
}

#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// `Ok(None)` when the item has no transcript.
    async fn fetch_transcript(&self, item_id: &str) -> Result<Option<Transcript>, ProviderError>;
}

#[async_trait]
pub trait ProfileSearcher: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<SearchResults, ProviderError>;
}

#[async_trait]
pub trait DemographicsPredictor: Send + Sync {
    async fn predict(&self, image_url: &str) -> Result<DemographicEstimate, ProviderError>;
}

/// Source of capability implementations, injected into the orchestrator.
pub trait ContentProvider: Send + Sync {
    fn profile_fetcher(&self, platform: &str) -> Option<Arc<dyn ProfileFetcher>>;
    fn content_fetcher(&self, platform: &str, operation: &str) -> Option<Arc<dyn ContentFetcher>>;
    fn comment_fetcher(&self, platform: &str) -> Option<Arc<dyn CommentFetcher>>;
    fn transcript_fetcher(&self, platform: &str) -> Option<Arc<dyn TranscriptFetcher>>;
    fn searcher(&self, platform: &str) -> Option<Arc<dyn ProfileSearcher>>;
    fn demographics_predictor(&self) -> Option<Arc<dyn DemographicsPredictor>>;
}

#[derive(Default, Clone)]
struct PlatformClients {
    profile: Option<Arc<dyn ProfileFetcher>>,
    content: HashMap<String, Arc<dyn ContentFetcher>>,
    comments: Option<Arc<dyn CommentFetcher>>,
    transcripts: Option<Arc<dyn TranscriptFetcher>>,
    search: Option<Arc<dyn ProfileSearcher>>,
}

/// Explicitly assembled table of capability implementations.
///
/// ```ignore
/// let provider = ProviderRegistry::builder()
///     .profile("tiktok", tiktok_profiles)
///     .content("tiktok", "user_videos", tiktok_videos)
///     .build();
/// ```
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    platforms: HashMap<String, PlatformClients>,
    demographics: Option<Arc<dyn DemographicsPredictor>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    fn clients(&self, platform: &str) -> Option<&PlatformClients> {
        self.platforms.get(&platform.trim().to_lowercase())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut platforms: Vec<&String> = self.platforms.keys().collect();
        platforms.sort();
        f.debug_struct("ProviderRegistry")
            .field("platforms", &platforms)
            .field("demographics", &self.demographics.is_some())
            .finish()
    }
}

impl ContentProvider for ProviderRegistry {
    fn profile_fetcher(&self, platform: &str) -> Option<Arc<dyn ProfileFetcher>> {
        self.clients(platform)?.profile.clone()
    }

    fn content_fetcher(&self, platform: &str, operation: &str) -> Option<Arc<dyn ContentFetcher>> {
        self.clients(platform)?.content.get(operation).cloned()
    }

    fn comment_fetcher(&self, platform: &str) -> Option<Arc<dyn CommentFetcher>> {
        self.clients(platform)?.comments.clone()
    }

    fn transcript_fetcher(&self, platform: &str) -> Option<Arc<dyn TranscriptFetcher>> {
        self.clients(platform)?.transcripts.clone()
    }

    fn searcher(&self, platform: &str) -> Option<Arc<dyn ProfileSearcher>> {
        self.clients(platform)?.search.clone()
    }

    fn demographics_predictor(&self) -> Option<Arc<dyn DemographicsPredictor>> {
        self.demographics.clone()
    }
}

#[derive(Default)]
pub struct ProviderRegistryBuilder {
    inner: ProviderRegistry,
}

impl ProviderRegistryBuilder {
    fn entry(&mut self, platform: &str) -> &mut PlatformClients {
        self.inner
            .platforms
            .entry(platform.trim().to_lowercase())
            .or_default()
    }

    #[must_use]
    pub fn profile(mut self, platform: &str, fetcher: Arc<dyn ProfileFetcher>) -> Self {
        self.entry(platform).profile = Some(fetcher);
        self
    }

    #[must_use]
    pub fn content(
        mut self,
        platform: &str,
        operation: &str,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        self.entry(platform)
            .content
            .insert(operation.to_string(), fetcher);
        self
    }

    #[must_use]
    pub fn comments(mut self, platform: &str, fetcher: Arc<dyn CommentFetcher>) -> Self {
        self.entry(platform).comments = Some(fetcher);
        self
    }

    #[must_use]
    pub fn transcripts(mut self, platform: &str, fetcher: Arc<dyn TranscriptFetcher>) -> Self {
        self.entry(platform).transcripts = Some(fetcher);
        self
    }

    #[must_use]
    pub fn search(mut self, platform: &str, searcher: Arc<dyn ProfileSearcher>) -> Self {
        self.entry(platform).search = Some(searcher);
        self
    }

    #[must_use]
    pub fn demographics(mut self, predictor: Arc<dyn DemographicsPredictor>) -> Self {
        self.inner.demographics = Some(predictor);
        self
    }

    #[must_use]
    pub fn build(self) -> ProviderRegistry {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProfile;

    #[async_trait]
    impl ProfileFetcher for FixedProfile {
        async fn fetch_profile(&self, handle: &str) -> Result<ProfileRecord, ProviderError> {
            Ok(ProfileRecord::new("tiktok", handle))
        }
    }

    struct EmptyContent;

    #[async_trait]
    impl ContentFetcher for EmptyContent {
        async fn fetch_content(
            &self,
            _key: &str,
            _params: &BTreeMap<String, Value>,
        ) -> Result<ResourcePayload, ProviderError> {
            Ok(ResourcePayload::Content(Vec::new()))
        }
    }

    #[tokio::test]
    async fn registered_capabilities_are_returned() {
        let provider = ProviderRegistry::builder()
            .profile("TikTok", Arc::new(FixedProfile))
            .content("tiktok", "user_videos", Arc::new(EmptyContent))
            .build();

        let fetcher = provider.profile_fetcher("tiktok").expect("profile registered");
        let profile = fetcher.fetch_profile("abc").await.unwrap();
        assert_eq!(profile.username, "abc");
        assert!(provider.content_fetcher("tiktok", "user_videos").is_some());
    }

    #[test]
    fn missing_capabilities_are_none() {
        let provider = ProviderRegistry::builder()
            .profile("tiktok", Arc::new(FixedProfile))
            .build();
        assert!(provider.content_fetcher("tiktok", "user_videos").is_none());
        assert!(provider.comment_fetcher("tiktok").is_none());
        assert!(provider.searcher("tiktok").is_none());
        assert!(provider.profile_fetcher("instagram").is_none());
        assert!(provider.demographics_predictor().is_none());
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let v = serde_json::to_value(ResourcePayload::Data(serde_json::json!({"a": 1}))).unwrap();
        assert_eq!(v["kind"], "data");
        assert_eq!(v["data"]["a"], 1);
    }
}
