//! Cross-platform discovery: look one handle up on a shortlist of platforms,
//! harvest link-aggregator pages, and mine confirmed bios for mentions of
//! further platforms.
//!
//! Discovery is heuristic and never fails: a not-found lookup is recorded as
//! `found: false`, any other lookup failure is logged and the platform left
//! out of the result.

mod bio;
mod links;

pub use bio::{MentionMatcher, MENTION_CONFIDENCE};
pub use links::extract_links;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use dossier_core::{
    AggregatorLink, DiscoveryResult, PlatformCapabilityRegistry, PlatformMatch, PotentialMatch,
    ProfileRecord,
};

use crate::dispatch::{Dispatcher, RunContext};
use crate::error::ProviderError;
use crate::provider::{ContentProvider, ProfileFetcher};

/// Scores how likely a found profile belongs to the searched identity.
pub type ConfidenceScorer = fn(query: &str, found: &ProfileRecord) -> f32;

/// 1.0 for a case-insensitive handle match, 0.8 for any other hit.
#[must_use]
pub fn handle_confidence(query: &str, found: &ProfileRecord) -> f32 {
    let query = query.trim().trim_start_matches('@');
    if found.username.trim_start_matches('@').eq_ignore_ascii_case(query) {
        1.0
    } else {
        0.8
    }
}

enum Lookup {
    Found(ProfileRecord),
    NotFound,
    Failed,
}

pub(crate) struct CrossPlatformDiscoverer<'a> {
    registry: &'a PlatformCapabilityRegistry,
    provider: &'a dyn ContentProvider,
    dispatcher: &'a Dispatcher,
    run: &'a RunContext,
    concurrency: usize,
    scorer: ConfidenceScorer,
}

impl<'a> CrossPlatformDiscoverer<'a> {
    pub(crate) fn new(
        registry: &'a PlatformCapabilityRegistry,
        provider: &'a dyn ContentProvider,
        dispatcher: &'a Dispatcher,
        run: &'a RunContext,
        concurrency: usize,
        scorer: ConfidenceScorer,
    ) -> Self {
        Self {
            registry,
            provider,
            dispatcher,
            run,
            concurrency: concurrency.max(1),
            scorer,
        }
    }

    /// Looks `handle` up on each of `platforms`.
    ///
    /// `seed` is an already-confirmed (platform, profile) pair; it is
    /// recorded as found without a call and is not looked up again.
    pub(crate) async fn discover(
        &self,
        handle: &str,
        platforms: &[String],
        seed: Option<(&str, &ProfileRecord)>,
    ) -> DiscoveryResult {
        let mut result = DiscoveryResult::new(handle);

        if let Some((platform, profile)) = seed {
            result.platforms.insert(
                platform.to_string(),
                PlatformMatch {
                    found: true,
                    profile: Some(profile.clone()),
                    confidence: (self.scorer)(handle, profile),
                },
            );
        }

        let targets = self.lookup_targets(platforms, seed.map(|(p, _)| p));
        let lookups: Vec<(String, Lookup)> = stream::iter(targets)
            .map(|(platform, fetcher)| async move {
                let lookup = self.lookup(&platform, &fetcher, handle).await;
                (platform, lookup)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (platform, lookup) in lookups {
            match lookup {
                Lookup::Found(profile) => {
                    let confidence = (self.scorer)(handle, &profile);
                    result.platforms.insert(
                        platform,
                        PlatformMatch {
                            found: true,
                            profile: Some(profile),
                            confidence,
                        },
                    );
                }
                Lookup::NotFound => {
                    result.platforms.insert(platform, PlatformMatch::not_found());
                }
                Lookup::Failed => {}
            }
        }

        result.links = self.aggregator_links(&result);
        result.potential_matches = self.bio_mentions(&result);

        tracing::info!(
            handle,
            found = result.found().count(),
            potential = result.potential_matches.len(),
            links = result.links.len(),
            "cross-platform discovery complete"
        );
        result
    }

    /// Known, deduplicated platforms that expose a profile fetcher.
    fn lookup_targets(
        &self,
        platforms: &[String],
        seed: Option<&str>,
    ) -> Vec<(String, Arc<dyn ProfileFetcher>)> {
        let mut seen: HashSet<String> = seed.map(str::to_string).into_iter().collect();
        let mut targets = Vec::new();
        for requested in platforms {
            let Ok(capability) = self.registry.get(requested) else {
                tracing::debug!(platform = %requested, "unknown platform skipped in discovery");
                continue;
            };
            if !seen.insert(capability.key.clone()) {
                continue;
            }
            match self.provider.profile_fetcher(&capability.key) {
                Some(fetcher) => targets.push((capability.key.clone(), fetcher)),
                None => tracing::debug!(
                    platform = %capability.key,
                    "no profile capability, skipped in discovery"
                ),
            }
        }
        targets
    }

    async fn lookup(
        &self,
        platform: &str,
        fetcher: &Arc<dyn ProfileFetcher>,
        handle: &str,
    ) -> Lookup {
        let operation = self
            .registry
            .get(platform)
            .map_or("profile", |c| c.profile_operation.as_str());
        let endpoint = format!("{platform}:{operation}");
        match self
            .dispatcher
            .call(self.run, &endpoint, || fetcher.fetch_profile(handle))
            .await
        {
            Ok(profile) => Lookup::Found(profile),
            Err(e) if e.error.is_not_found() => {
                tracing::debug!(platform, handle, "handle not found");
                Lookup::NotFound
            }
            Err(e) => {
                if !matches!(e.error, ProviderError::DeadlineExceeded) {
                    tracing::warn!(platform, handle, error = %e, "discovery lookup failed");
                }
                Lookup::Failed
            }
        }
    }

    fn aggregator_links(&self, result: &DiscoveryResult) -> Vec<AggregatorLink> {
        let mut links = Vec::new();
        for (platform, found) in result.found() {
            let is_aggregator = self
                .registry
                .get(platform)
                .is_ok_and(|c| c.link_aggregator);
            let Some(profile) = found.profile.as_ref().filter(|_| is_aggregator) else {
                continue;
            };
            links.extend(extract_links(&profile.raw).into_iter().map(|url| AggregatorLink {
                source_platform: platform.clone(),
                url,
            }));
        }
        links
    }

    fn bio_mentions(&self, result: &DiscoveryResult) -> Vec<PotentialMatch> {
        let confirmed: HashSet<&str> = result.found().map(|(p, _)| p.as_str()).collect();
        let matchers: Vec<MentionMatcher> = self
            .registry
            .iter()
            .filter(|c| !confirmed.contains(c.key.as_str()))
            .filter_map(MentionMatcher::new)
            .collect();

        let mut matches = Vec::new();
        for (source, found) in result.found() {
            let Some(bio) = found.profile.as_ref().and_then(|p| p.bio.as_deref()) else {
                continue;
            };
            for matcher in &matchers {
                if matches
                    .iter()
                    .any(|m: &PotentialMatch| m.platform == matcher.platform())
                {
                    continue;
                }
                if let Some(m) = matcher.find(bio, source) {
                    matches.push(m);
                }
            }
        }
        matches
    }
}
