//! HTTP gateway provider.
//!
//! One JSON gateway serves every platform in the registry. Routes are
//! derived from the capability table:
//!
//! | Capability   | Request                                                  |
//! |--------------|----------------------------------------------------------|
//! | profile      | `GET {base}/{platform}/{profile_operation}?username=`    |
//! | secondary    | `GET {base}/{platform}/{operation}?id=&<params>`         |
//! | comments     | `GET {base}/{platform}/{comment_operation}?item_id=&count=` |
//! | transcripts  | `GET {base}/{platform}/{transcript_operation}?item_id=`  |
//! | search       | `GET {base}/{platform}/{search_operation}?query=&count=` |
//! | demographics | `POST {base}/vision/demographics {"image_url"}`          |

pub mod normalize;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::{json, Value};

use dossier_core::{
    AppConfig, Comment, DemographicEstimate, PlatformCapabilityRegistry, ProfileRecord,
    ResultSlot, Transcript,
};

use crate::error::ProviderError;
use crate::provider::{
    CommentFetcher, ContentFetcher, DemographicsPredictor, ProfileFetcher, ProfileSearcher,
    ProviderRegistry, ResourcePayload, SearchResults, TranscriptFetcher,
};
use crate::rate_limit::MinIntervalLimiter;

/// Wait assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Shared transport: client, base URL, credentials and request spacing.
struct Gateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    spacing: MinIntervalLimiter,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("spacing", &self.spacing)
            .finish_non_exhaustive()
    }
}

/// Gateway-backed implementation of every provider capability.
///
/// Use [`HttpProvider::new`] for configured deployments or
/// [`HttpProvider::with_base_url`] to point at a mock server in tests, then
/// [`HttpProvider::into_registry`] to expose it to the orchestrator.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    gateway: Arc<Gateway>,
}

impl HttpProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the client cannot be built or
    /// [`ProviderError::Other`] if the provider URL is invalid.
    pub fn new(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::with_base_url(
            &config.provider_url,
            config.provider_api_key.as_deref(),
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
            Duration::from_millis(config.min_request_interval_ms),
        )
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the client cannot be built or
    /// [`ProviderError::Other`] if `base_url` is not a valid base URL.
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
        user_agent: &str,
        min_interval: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ProviderError::Other(format!("invalid provider URL '{base_url}'")))?;

        Ok(Self {
            gateway: Arc::new(Gateway {
                client,
                base_url,
                api_key: api_key.map(str::to_owned),
                spacing: MinIntervalLimiter::new(min_interval),
            }),
        })
    }

    /// Registers an implementation for every operation named in `registry`,
    /// plus the shared demographics predictor.
    #[must_use]
    pub fn into_registry(self, registry: &PlatformCapabilityRegistry) -> ProviderRegistry {
        let gateway = self.gateway;
        let endpoint = |platform: &str, operation: &str| Endpoint {
            gateway: Arc::clone(&gateway),
            platform: platform.to_string(),
            operation: operation.to_string(),
        };

        let mut builder = ProviderRegistry::builder().demographics(Arc::new(Endpoint {
            gateway: Arc::clone(&gateway),
            platform: "vision".to_string(),
            operation: "demographics".to_string(),
        }));
        for cap in registry.iter() {
            builder = builder.profile(&cap.key, Arc::new(endpoint(&cap.key, &cap.profile_operation)));
            for op in &cap.secondary {
                builder = builder.content(
                    &cap.key,
                    &op.operation,
                    Arc::new(SecondaryEndpoint {
                        endpoint: endpoint(&cap.key, &op.operation),
                        slot: op.slot(),
                    }),
                );
            }
            if let Some(operation) = &cap.comment_operation {
                builder = builder.comments(&cap.key, Arc::new(endpoint(&cap.key, operation)));
            }
            if let Some(operation) = &cap.transcript_operation {
                builder = builder.transcripts(&cap.key, Arc::new(endpoint(&cap.key, operation)));
            }
            if let Some(operation) = &cap.search_operation {
                builder = builder.search(&cap.key, Arc::new(endpoint(&cap.key, operation)));
            }
        }
        builder.build()
    }
}

impl Gateway {
    /// `{base}/{segments...}?{query}` with every part percent-encoded.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::Other(format!("invalid provider URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, ProviderError> {
        self.spacing.wait().await;
        tracing::debug!(url = %url, "GET");
        let response = self.authorize(self.client.get(url)).send().await?;
        read_json(response).await
    }

    async fn post_json(&self, url: Url, body: &Value) -> Result<Value, ProviderError> {
        self.spacing.wait().await;
        tracing::debug!(url = %url, "POST");
        let response = self.authorize(self.client.post(url).json(body)).send().await?;
        read_json(response).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Maps the status onto [`ProviderError`] and parses a 2xx body as JSON.
async fn read_json(response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    let url = response.url().clone();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited {
            retry_after: retry_after(response.headers()),
        });
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::not_found(url.path().to_string()));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::Unauthorized(format!(
            "HTTP {} from {}",
            status.as_u16(),
            url.path()
        )));
    }
    if status.is_server_error() {
        return Err(ProviderError::Upstream {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
        context: url.path().to_string(),
        source: e,
    })
}

/// `Retry-After` in delay-seconds form; other forms fall back to the default.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

/// One (platform, operation) route on the gateway.
#[derive(Debug)]
struct Endpoint {
    gateway: Arc<Gateway>,
    platform: String,
    operation: String,
}

impl Endpoint {
    fn url(&self, query: &[(&str, String)]) -> Result<Url, ProviderError> {
        self.gateway.url(&[&self.platform, &self.operation], query)
    }
}

#[derive(Debug)]
struct SecondaryEndpoint {
    endpoint: Endpoint,
    slot: ResultSlot,
}

#[async_trait]
impl ProfileFetcher for Endpoint {
    async fn fetch_profile(&self, handle: &str) -> Result<ProfileRecord, ProviderError> {
        let url = self.url(&[("username", handle.to_string())])?;
        let body = self.gateway.get_json(url).await?;
        if body.is_null() {
            return Err(ProviderError::not_found(format!("{} user {handle}", self.platform)));
        }
        normalize::profile(&self.platform, handle, body)
    }
}

#[async_trait]
impl ContentFetcher for SecondaryEndpoint {
    async fn fetch_content(
        &self,
        key: &str,
        params: &BTreeMap<String, Value>,
    ) -> Result<ResourcePayload, ProviderError> {
        let mut query = vec![("id", key.to_string())];
        query.extend(params.iter().map(|(k, v)| (k.as_str(), param_string(v))));
        let url = self.endpoint.url(&query)?;
        let body = self.endpoint.gateway.get_json(url).await?;
        Ok(normalize::secondary(&self.endpoint.platform, self.slot, body))
    }
}

#[async_trait]
impl CommentFetcher for Endpoint {
    async fn fetch_comments(
        &self,
        item_id: &str,
        count: usize,
    ) -> Result<Vec<Comment>, ProviderError> {
        let url = self.url(&[("item_id", item_id.to_string()), ("count", count.to_string())])?;
        let body = self.gateway.get_json(url).await?;
        Ok(normalize::comments(item_id, body))
    }
}

#[async_trait]
impl TranscriptFetcher for Endpoint {
    async fn fetch_transcript(&self, item_id: &str) -> Result<Option<Transcript>, ProviderError> {
        let url = self.url(&[("item_id", item_id.to_string())])?;
        match self.gateway.get_json(url).await {
            Ok(body) => Ok(normalize::transcript(item_id, body)),
            // A missing transcript is an empty result, not a failure.
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ProfileSearcher for Endpoint {
    async fn search(&self, query: &str, count: usize) -> Result<SearchResults, ProviderError> {
        let url = self.url(&[("query", query.to_string()), ("count", count.to_string())])?;
        let body = self.gateway.get_json(url).await?;
        Ok(normalize::search(&self.platform, body))
    }
}

#[async_trait]
impl DemographicsPredictor for Endpoint {
    async fn predict(&self, image_url: &str) -> Result<DemographicEstimate, ProviderError> {
        let url = self.url(&[])?;
        let body = self
            .gateway
            .post_json(url, &json!({ "image_url": image_url }))
            .await?;
        Ok(normalize::demographics(body))
    }
}

/// Query-string form of a parameter value.
fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
