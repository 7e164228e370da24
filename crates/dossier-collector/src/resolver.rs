//! Search-based recovery of a working profile after a direct lookup fails.

use std::sync::Arc;

use dossier_core::{ProfileRecord, ResolutionMethod};

use crate::dispatch::{CallResult, Dispatcher, RunContext};
use crate::provider::{ContentProvider, ProfileSearcher, SearchResults};

/// Default name of the search operation when a platform does not name one.
const DEFAULT_SEARCH_OPERATION: &str = "search";

/// A profile recovered from search, and how it was recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub profile: ProfileRecord,
    pub method: ResolutionMethod,
}

impl ResolvedIdentity {
    /// The handle every later fetch in the run must use.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.profile.username
    }

    /// Maps a search response onto a profile.
    ///
    /// A channel match is taken as-is. Failing that, the author of the first
    /// content match becomes a minimal profile with every counter unset.
    /// Returns `None` when neither yields a usable handle.
    #[must_use]
    pub fn from_search(platform: &str, results: SearchResults) -> Option<Self> {
        if let Some(mut profile) = results
            .channels
            .into_iter()
            .find(|c| !c.username.trim().is_empty())
        {
            if profile.platform.is_empty() {
                profile.platform = platform.to_string();
            }
            return Some(Self {
                profile,
                method: ResolutionMethod::Channel,
            });
        }

        let author = results
            .content
            .into_iter()
            .next()
            .and_then(|item| item.author)
            .filter(|a| !a.username.trim().is_empty())?;

        let mut profile = ProfileRecord::new(platform, &author.username);
        profile.display_name = author.display_name;
        profile.external_id = author.external_id;
        Some(Self {
            profile,
            method: ResolutionMethod::ContentAuthor,
        })
    }
}

/// Runs the platform's search capability on behalf of one collection run.
pub(crate) struct IdentityResolver<'a> {
    provider: &'a dyn ContentProvider,
    dispatcher: &'a Dispatcher,
    run: &'a RunContext,
}

impl<'a> IdentityResolver<'a> {
    pub(crate) fn new(
        provider: &'a dyn ContentProvider,
        dispatcher: &'a Dispatcher,
        run: &'a RunContext,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            run,
        }
    }

    /// Searches `platform` for `query`, asking for a single result.
    ///
    /// `Ok(None)` means no match: either the platform has no search
    /// capability or the search came back empty. Neither is an error.
    pub(crate) async fn resolve(
        &self,
        platform: &str,
        search_operation: Option<&str>,
        query: &str,
    ) -> CallResult<Option<ResolvedIdentity>> {
        let Some(searcher) = self.provider.searcher(platform) else {
            tracing::debug!(platform, "no search capability, skipping identity resolution");
            return Ok(None);
        };
        let operation = search_operation.unwrap_or(DEFAULT_SEARCH_OPERATION);
        let endpoint = format!("{platform}:{operation}");

        let results = self
            .dispatcher
            .call(self.run, &endpoint, || search(&searcher, query))
            .await?;

        let resolved = ResolvedIdentity::from_search(platform, results);
        match &resolved {
            Some(identity) => tracing::info!(
                platform,
                query,
                resolved = identity.handle(),
                method = ?identity.method,
                "identity resolved via search"
            ),
            None => tracing::info!(platform, query, "identity resolution found no match"),
        }
        Ok(resolved)
    }
}

async fn search(
    searcher: &Arc<dyn ProfileSearcher>,
    query: &str,
) -> Result<SearchResults, crate::error::ProviderError> {
    searcher.search(query, 1).await
}
