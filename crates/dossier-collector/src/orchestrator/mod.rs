//! Collection orchestrator: Quick and Deep runs over one (platform, handle).
//!
//! A run never fails past this boundary. Every provider failure is caught at
//! its call site and appended to the dossier's error log; the only early
//! return is for a platform missing from the registry.

mod deep;
mod quick;
mod routing;

use std::future::Future;
use std::sync::Arc;

use dossier_core::{
    CollectionMode, CollectionStage, DiscoveryResult, Dossier, PlatformCapability,
    PlatformCapabilityRegistry,
};

use crate::config::CollectorConfig;
use crate::discovery::CrossPlatformDiscoverer;
use crate::dispatch::{CallResult, Dispatcher, RunContext};
use crate::error::{CollectError, ProviderError};
use crate::provider::ContentProvider;
use crate::retry::RetryError;

/// Stage toggles for a Deep run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepOptions {
    pub include_comments: bool,
    pub include_transcripts: bool,
    pub include_discovery: bool,
    /// Platforms checked by discovery; the configured shortlist when `None`.
    pub discovery_platforms: Option<Vec<String>>,
}

impl Default for DeepOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            include_transcripts: true,
            include_discovery: true,
            discovery_platforms: None,
        }
    }
}

struct Inner {
    registry: Arc<PlatformCapabilityRegistry>,
    provider: Arc<dyn ContentProvider>,
    dispatcher: Dispatcher,
    config: CollectorConfig,
}

/// Entry point for all collection. Cheap to clone; clones share the
/// per-endpoint rate limiters.
#[derive(Clone)]
pub struct CollectionOrchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CollectionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionOrchestrator")
            .field("platforms", &self.inner.registry.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl CollectionOrchestrator {
    #[must_use]
    pub fn new(
        registry: Arc<PlatformCapabilityRegistry>,
        provider: Arc<dyn ContentProvider>,
        config: CollectorConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(&config);
        Self {
            inner: Arc::new(Inner {
                registry,
                provider,
                dispatcher,
                config,
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &PlatformCapabilityRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn config(&self) -> &CollectorConfig {
        &self.inner.config
    }

    /// Profile plus one small content batch, within the quick deadline.
    pub async fn quick_scan(&self, platform: &str, handle: &str) -> Dossier {
        let capability = match self.capability(platform) {
            Ok(c) => c,
            Err(e) => return unsupported(CollectionMode::Quick, platform, handle, &e),
        };
        let ctx = RunContext::new(self.inner.config.quick_deadline);
        let env = RunEnv::new(&self.inner, capability, &ctx);
        let mut dossier = Dossier::new(CollectionMode::Quick, &capability.key, handle);

        tracing::info!(platform = %capability.key, handle, "starting quick scan");
        quick::run(env, &mut dossier).await;
        env.finish(&mut dossier);
        dossier
    }

    /// Every supported resource for the platform, within the deep deadline.
    pub async fn deep_dossier(
        &self,
        platform: &str,
        handle: &str,
        options: &DeepOptions,
    ) -> Dossier {
        let capability = match self.capability(platform) {
            Ok(c) => c,
            Err(e) => return unsupported(CollectionMode::Deep, platform, handle, &e),
        };
        let ctx = RunContext::new(self.inner.config.deep_deadline);
        let env = RunEnv::new(&self.inner, capability, &ctx);
        let mut dossier = Dossier::new(CollectionMode::Deep, &capability.key, handle);

        tracing::info!(platform = %capability.key, handle, "starting deep collection");
        deep::run(env, &mut dossier, options).await;
        env.finish(&mut dossier);
        dossier
    }

    /// Runs `mode` with default options.
    pub async fn collect(&self, mode: CollectionMode, platform: &str, handle: &str) -> Dossier {
        match mode {
            CollectionMode::Quick => self.quick_scan(platform, handle).await,
            CollectionMode::Deep => {
                self.deep_dossier(platform, handle, &DeepOptions::default())
                    .await
            }
        }
    }

    /// Standalone discovery for `handle`, bounded by the deep deadline.
    /// Checks the configured shortlist when `platforms` is `None`.
    pub async fn discover(&self, handle: &str, platforms: Option<&[String]>) -> DiscoveryResult {
        let ctx = RunContext::new(self.inner.config.deep_deadline);
        let platforms = platforms.unwrap_or(&self.inner.config.discovery_platforms);
        self.inner
            .discoverer(&ctx)
            .discover(handle, platforms, None)
            .await
    }

    fn capability(&self, platform: &str) -> Result<&PlatformCapability, CollectError> {
        self.inner
            .registry
            .get(platform)
            .map_err(|_| CollectError::UnsupportedPlatform(platform.trim().to_string()))
    }
}

fn unsupported(mode: CollectionMode, platform: &str, handle: &str, err: &CollectError) -> Dossier {
    tracing::warn!(platform, handle, %mode, error = %err, "collection rejected");
    Dossier::unsupported(mode, platform.trim(), handle)
}

impl Inner {
    fn discoverer<'a>(&'a self, ctx: &'a RunContext) -> CrossPlatformDiscoverer<'a> {
        CrossPlatformDiscoverer::new(
            &self.registry,
            self.provider.as_ref(),
            &self.dispatcher,
            ctx,
            self.config.max_concurrent_operations,
            self.config.confidence_scorer,
        )
    }
}

/// Shared, read-only view of one run: the orchestrator's state, the
/// platform's capability entry and the run's call accounting.
#[derive(Clone, Copy)]
pub(crate) struct RunEnv<'a> {
    inner: &'a Inner,
    capability: &'a PlatformCapability,
    ctx: &'a RunContext,
}

impl<'a> RunEnv<'a> {
    fn new(inner: &'a Inner, capability: &'a PlatformCapability, ctx: &'a RunContext) -> Self {
        Self {
            inner,
            capability,
            ctx,
        }
    }

    fn platform(self) -> &'a str {
        &self.capability.key
    }

    fn config(self) -> &'a CollectorConfig {
        &self.inner.config
    }

    fn provider(self) -> &'a dyn ContentProvider {
        self.inner.provider.as_ref()
    }

    /// Runs one provider call against `operation` on this run's platform.
    async fn call<T, F, Fut>(self, operation: &str, op: F) -> CallResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let endpoint = format!("{}:{operation}", self.platform());
        self.inner.dispatcher.call(self.ctx, &endpoint, op).await
    }

    /// Enters `stage`, or stops the run if its deadline has passed.
    fn enter(self, dossier: &mut Dossier, stage: CollectionStage) -> bool {
        if self.ctx.expired() {
            self.deadline_exceeded(dossier);
            return false;
        }
        tracing::debug!(platform = self.platform(), %stage, "entering stage");
        dossier.statistics.stage = stage;
        true
    }

    /// Records the single deadline entry for this run.
    fn deadline_exceeded(self, dossier: &mut Dossier) {
        if dossier.statistics.deadline_exceeded {
            return;
        }
        dossier.statistics.deadline_exceeded = true;
        tracing::warn!(
            platform = self.platform(),
            stage = %dossier.statistics.stage,
            elapsed_ms = self.ctx.elapsed_ms(),
            "run deadline exceeded, returning partial dossier"
        );
        dossier.record_error(
            "run",
            format!("deadline exceeded after {}ms", self.ctx.elapsed_ms()),
        );
    }

    /// Logs a failed call and appends it to the error log. A deadline
    /// failure becomes the run's single deadline entry instead.
    fn fail(self, dossier: &mut Dossier, resource: &str, err: &RetryError<ProviderError>) {
        if matches!(err.error, ProviderError::DeadlineExceeded) {
            self.deadline_exceeded(dossier);
            return;
        }
        tracing::warn!(
            platform = self.platform(),
            resource,
            attempts = err.attempts,
            error = %err.error,
            "provider call failed"
        );
        dossier.record_error(resource, err);
    }

    fn finish(self, dossier: &mut Dossier) {
        if self.ctx.expired() {
            self.deadline_exceeded(dossier);
        }
        let stats = &mut dossier.statistics;
        stats.api_calls = self.ctx.api_calls();
        stats.elapsed_ms = self.ctx.elapsed_ms();
        stats.content_items = dossier.content.len();
        stats.comments_collected = dossier.comments.total_count;
        stats.transcripts_collected = dossier.transcripts.len();
        if !stats.deadline_exceeded {
            stats.stage = CollectionStage::Done;
        }
        tracing::info!(
            platform = self.platform(),
            handle = %dossier.username,
            api_calls = stats.api_calls,
            content_items = stats.content_items,
            errors = dossier.errors.len(),
            elapsed_ms = stats.elapsed_ms,
            "collection finished"
        );
    }
}
