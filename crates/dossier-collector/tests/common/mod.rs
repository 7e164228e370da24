//! Stub capability implementations shared by the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use dossier_collector::{
    CollectionOrchestrator, CollectorConfig, CommentFetcher, ContentFetcher, DemographicsPredictor,
    ProfileFetcher, ProfileSearcher, ProviderError, ProviderRegistry, ResourcePayload,
    RetryPolicy, SearchResults, TranscriptFetcher,
};
use dossier_core::{
    AccountRef, Comment, ContentItem, DemographicEstimate, PlatformCapabilityRegistry,
    ProfileRecord, Transcript,
};

/// Config with no back-off sleeps and a generous rate limit.
pub fn test_config() -> CollectorConfig {
    CollectorConfig {
        retry: RetryPolicy::new(0, Duration::ZERO),
        rate_limit_calls: 1_000,
        ..CollectorConfig::default()
    }
}

pub fn orchestrator(provider: ProviderRegistry, config: CollectorConfig) -> CollectionOrchestrator {
    let registry = PlatformCapabilityRegistry::builtin().expect("built-in table is valid");
    CollectionOrchestrator::new(Arc::new(registry), Arc::new(provider), config)
}

pub fn profile(platform: &str, username: &str) -> ProfileRecord {
    let mut p = ProfileRecord::new(platform, username);
    p.external_id = Some(format!("{platform}-{username}-id"));
    p
}

/// Known profiles keyed by lower-cased username; anything else is not found.
pub struct Profiles {
    known: HashMap<String, ProfileRecord>,
    pub calls: AtomicU32,
}

impl Profiles {
    pub fn of(profiles: Vec<ProfileRecord>) -> Arc<Self> {
        Arc::new(Self {
            known: profiles
                .into_iter()
                .map(|p| (p.username.to_lowercase(), p))
                .collect(),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileFetcher for Profiles {
    async fn fetch_profile(&self, handle: &str) -> Result<ProfileRecord, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.known
            .get(&handle.trim_start_matches('@').to_lowercase())
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("user {handle}")))
    }
}

/// Terminal failure on every call.
pub struct Rejecting;

#[async_trait]
impl ProfileFetcher for Rejecting {
    async fn fetch_profile(&self, _handle: &str) -> Result<ProfileRecord, ProviderError> {
        Err(ProviderError::Unauthorized("bad key".to_string()))
    }
}

#[async_trait]
impl ContentFetcher for Rejecting {
    async fn fetch_content(
        &self,
        _key: &str,
        _params: &BTreeMap<String, Value>,
    ) -> Result<ResourcePayload, ProviderError> {
        Err(ProviderError::Unauthorized("bad key".to_string()))
    }
}

pub struct Panicking;

#[async_trait]
impl ProfileFetcher for Panicking {
    async fn fetch_profile(&self, _handle: &str) -> Result<ProfileRecord, ProviderError> {
        panic!("provider blew up");
    }
}

/// Returns its profile after sleeping.
pub struct Slow {
    pub delay: Duration,
    pub profile: ProfileRecord,
}

#[async_trait]
impl ProfileFetcher for Slow {
    async fn fetch_profile(&self, _handle: &str) -> Result<ProfileRecord, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.profile.clone())
    }
}

/// `count` content items with ids `{prefix}{i}`; records the keys it saw.
pub struct Items {
    pub platform: String,
    pub prefix: String,
    pub count: usize,
    pub keys: std::sync::Mutex<Vec<String>>,
}

impl Items {
    pub fn new(platform: &str, prefix: &str, count: usize) -> Arc<Self> {
        Arc::new(Self {
            platform: platform.to_string(),
            prefix: prefix.to_string(),
            count,
            keys: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn seen_keys(&self) -> Vec<String> {
        self.keys.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ContentFetcher for Items {
    async fn fetch_content(
        &self,
        key: &str,
        params: &BTreeMap<String, Value>,
    ) -> Result<ResourcePayload, ProviderError> {
        self.keys.lock().expect("lock").push(key.to_string());
        let requested = params
            .get("count")
            .and_then(Value::as_u64)
            .map_or(self.count, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let items = (0..self.count.min(requested))
            .map(|i| ContentItem::new(&self.platform, &format!("{}{i}", self.prefix)))
            .collect();
        Ok(ResourcePayload::Content(items))
    }
}

pub struct Accounts(pub usize);

#[async_trait]
impl ContentFetcher for Accounts {
    async fn fetch_content(
        &self,
        _key: &str,
        _params: &BTreeMap<String, Value>,
    ) -> Result<ResourcePayload, ProviderError> {
        let accounts = (0..self.0)
            .map(|i| AccountRef {
                username: format!("acct{i}"),
                display_name: None,
                external_id: None,
            })
            .collect();
        Ok(ResourcePayload::Accounts(accounts))
    }
}

pub struct Data(pub Value);

#[async_trait]
impl ContentFetcher for Data {
    async fn fetch_content(
        &self,
        _key: &str,
        _params: &BTreeMap<String, Value>,
    ) -> Result<ResourcePayload, ProviderError> {
        Ok(ResourcePayload::Data(self.0.clone()))
    }
}

/// Always returns `.0` comments per item, ignoring the requested count.
pub struct FloodingComments(pub usize);

#[async_trait]
impl CommentFetcher for FloodingComments {
    async fn fetch_comments(
        &self,
        item_id: &str,
        _count: usize,
    ) -> Result<Vec<Comment>, ProviderError> {
        Ok((0..self.0)
            .map(|i| Comment {
                id: format!("{item_id}-c{i}"),
                item_id: item_id.to_string(),
                author: None,
                text: "first".to_string(),
                likes: Some(1),
            })
            .collect())
    }
}

/// `available` comments per item, trimmed to the requested count. Items in
/// `failing` return an upstream error.
pub struct Comments {
    pub available: usize,
    pub failing: HashSet<String>,
}

#[async_trait]
impl CommentFetcher for Comments {
    async fn fetch_comments(
        &self,
        item_id: &str,
        count: usize,
    ) -> Result<Vec<Comment>, ProviderError> {
        if self.failing.contains(item_id) {
            return Err(ProviderError::Upstream { status: 503 });
        }
        Ok((0..self.available.min(count))
            .map(|i| Comment {
                id: format!("{item_id}-c{i}"),
                item_id: item_id.to_string(),
                author: Some(format!("fan{i}")),
                text: "nice".to_string(),
                likes: None,
            })
            .collect())
    }
}

/// Transcript text for every item except those listed as silent.
pub struct Transcripts {
    pub silent: HashSet<String>,
}

#[async_trait]
impl TranscriptFetcher for Transcripts {
    async fn fetch_transcript(&self, item_id: &str) -> Result<Option<Transcript>, ProviderError> {
        let text = if self.silent.contains(item_id) {
            "   ".to_string()
        } else {
            format!("spoken words in {item_id}")
        };
        Ok(Some(Transcript {
            item_id: item_id.to_string(),
            text,
            language: Some("en".to_string()),
        }))
    }
}

pub struct FixedSearch(pub SearchResults);

#[async_trait]
impl ProfileSearcher for FixedSearch {
    async fn search(&self, _query: &str, _count: usize) -> Result<SearchResults, ProviderError> {
        Ok(self.0.clone())
    }
}

pub struct FixedEstimate;

#[async_trait]
impl DemographicsPredictor for FixedEstimate {
    async fn predict(&self, _image_url: &str) -> Result<DemographicEstimate, ProviderError> {
        Ok(DemographicEstimate {
            age: Some(27),
            gender: Some("female".to_string()),
        })
    }
}
