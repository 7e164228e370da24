use futures::stream::{self, StreamExt};

use dossier_core::{CollectionStage, ConnectedAccount, Demographics, Dossier, Resolution};

use super::routing::{self, ProfileFailure};
use super::{DeepOptions, RunEnv};
use crate::error::ProviderError;
use crate::resolver::IdentityResolver;

/// Runs every stage in order. A stage's failures never skip later stages;
/// only the run deadline stops the sequence.
pub(super) async fn run(env: RunEnv<'_>, dossier: &mut Dossier, options: &DeepOptions) {
    if !env.enter(dossier, CollectionStage::ProfileFetch) {
        return;
    }
    profile(env, dossier).await;

    if !env.enter(dossier, CollectionStage::SecondaryFetch) {
        return;
    }
    secondary(env, dossier).await;

    if !env.enter(dossier, CollectionStage::Comments) {
        return;
    }
    if options.include_comments {
        comments(env, dossier).await;
    }

    if !env.enter(dossier, CollectionStage::Transcripts) {
        return;
    }
    if options.include_transcripts {
        transcripts(env, dossier).await;
    }

    if !env.enter(dossier, CollectionStage::Demographics) {
        return;
    }
    demographics(env, dossier).await;

    if !env.enter(dossier, CollectionStage::CrossDiscovery) {
        return;
    }
    if options.include_discovery {
        discovery(env, dossier, options).await;
    }
}

/// Direct fetch, falling back to identity resolution. A resolved identity
/// replaces the working handle for the rest of the run.
async fn profile(env: RunEnv<'_>, dossier: &mut Dossier) {
    let handle = dossier.requested_handle.clone();
    let failure = match routing::fetch_profile(env, &handle).await {
        Ok(profile) => {
            dossier.profile = Some(profile);
            return;
        }
        Err(failure) => failure,
    };
    if let ProfileFailure::Call(err) = &failure {
        if matches!(err.error, ProviderError::DeadlineExceeded) {
            failure.record(env, dossier);
            return;
        }
        tracing::info!(
            platform = env.platform(),
            handle = %handle,
            error = %err.error,
            "profile fetch failed, attempting identity resolution"
        );
    }

    let resolver = IdentityResolver::new(env.provider(), &env.inner.dispatcher, env.ctx);
    let search_operation = env.capability.search_operation.as_deref();
    match resolver
        .resolve(env.platform(), search_operation, &handle)
        .await
    {
        Ok(Some(identity)) => {
            let resolved = identity.handle().to_string();
            dossier.username.clone_from(&resolved);
            dossier.resolution = Some(Resolution {
                original_handle: handle,
                resolved_handle: resolved,
                method: identity.method,
            });
            dossier.profile = Some(identity.profile);
        }
        Ok(None) => failure.record(env, dossier),
        Err(err) => {
            failure.record(env, dossier);
            env.fail(dossier, "identity resolution", &err);
        }
    }
}

/// Every secondary operation, fetched concurrently and applied in table
/// order so content keeps its fetch order.
async fn secondary(env: RunEnv<'_>, dossier: &mut Dossier) {
    let key = routing::content_key(env, dossier);
    let key = key.as_str();
    let ops = &env.capability.secondary;

    let outcomes: Vec<_> = stream::iter(ops)
        .map(move |op| routing::fetch_secondary(env, op, key))
        .buffered(env.config().max_concurrent_operations.max(1))
        .collect()
        .await;

    let budget = env.config().content_budget;
    for (op, outcome) in ops.iter().zip(outcomes) {
        if let Some(outcome) = outcome {
            routing::apply(env, dossier, op, outcome, budget);
        }
    }
}

/// Comments for the leading content items: a capped sample plus a running
/// total of everything fetched.
async fn comments(env: RunEnv<'_>, dossier: &mut Dossier) {
    let Some(operation) = env.capability.comment_operation.as_deref() else {
        return;
    };
    let Some(fetcher) = env.provider().comment_fetcher(env.platform()) else {
        tracing::debug!(platform = env.platform(), "comments not provided, skipping");
        return;
    };
    let config = env.config();
    let item_ids: Vec<String> = dossier
        .content
        .iter()
        .take(config.comment_items)
        .map(|item| item.id.clone())
        .collect();
    if item_ids.is_empty() {
        return;
    }

    let fetcher = &fetcher;
    let per_item = config.comments_per_item;
    let outcomes: Vec<_> = stream::iter(&item_ids)
        .map(move |id| env.call(operation, move || fetcher.fetch_comments(id, per_item)))
        .buffered(config.max_concurrent_operations.max(1))
        .collect()
        .await;

    for (id, outcome) in item_ids.iter().zip(outcomes) {
        match outcome {
            Ok(comments) => {
                let sample = &mut dossier.comments;
                let kept: Vec<_> = comments.into_iter().take(per_item).collect();
                sample.total_count += kept.len();
                let room = config.comment_sample_cap.saturating_sub(sample.items.len());
                sample.items.extend(kept.into_iter().take(room));
            }
            Err(err) => env.fail(dossier, &format!("comments {id}"), &err),
        }
    }
}

/// Transcripts for a smaller prefix of content items. Empty transcripts are
/// dropped.
async fn transcripts(env: RunEnv<'_>, dossier: &mut Dossier) {
    let Some(operation) = env.capability.transcript_operation.as_deref() else {
        return;
    };
    let Some(fetcher) = env.provider().transcript_fetcher(env.platform()) else {
        tracing::debug!(platform = env.platform(), "transcripts not provided, skipping");
        return;
    };
    let config = env.config();
    let item_ids: Vec<String> = dossier
        .content
        .iter()
        .take(config.transcript_items)
        .map(|item| item.id.clone())
        .collect();
    if item_ids.is_empty() {
        return;
    }

    let fetcher = &fetcher;
    let outcomes: Vec<_> = stream::iter(&item_ids)
        .map(move |id| env.call(operation, move || fetcher.fetch_transcript(id)))
        .buffered(config.max_concurrent_operations.max(1))
        .collect()
        .await;

    for (id, outcome) in item_ids.iter().zip(outcomes) {
        match outcome {
            Ok(Some(transcript)) if !transcript.is_empty() => dossier.transcripts.push(transcript),
            Ok(_) => tracing::debug!(platform = env.platform(), item_id = %id, "empty transcript"),
            Err(err) => env.fail(dossier, &format!("transcript {id}"), &err),
        }
    }
}

/// Age/gender estimate from the avatar. Skipped quietly when there is no
/// avatar, no predictor, or the prediction fails.
async fn demographics(env: RunEnv<'_>, dossier: &mut Dossier) {
    let Some(avatar) = dossier
        .profile
        .as_ref()
        .and_then(|p| p.avatar_url.clone())
        .filter(|url| !url.trim().is_empty())
    else {
        return;
    };
    let Some(predictor) = env.provider().demographics_predictor() else {
        return;
    };

    match env
        .inner
        .dispatcher
        .call(env.ctx, "vision:demographics", || predictor.predict(&avatar))
        .await
    {
        Ok(estimate) => {
            dossier
                .demographics
                .get_or_insert_with(Demographics::default)
                .estimate = Some(estimate);
        }
        Err(err) if matches!(err.error, ProviderError::DeadlineExceeded) => {
            env.deadline_exceeded(dossier);
        }
        Err(err) => tracing::debug!(
            platform = env.platform(),
            error = %err,
            "demographics prediction skipped"
        ),
    }
}

/// Discovery seeded with the confirmed platform; every other found platform
/// becomes a connected account.
async fn discovery(env: RunEnv<'_>, dossier: &mut Dossier, options: &DeepOptions) {
    let platforms = options
        .discovery_platforms
        .as_deref()
        .unwrap_or(env.config().discovery_platforms.as_slice());
    let handle = dossier.username.clone();
    let seed = dossier.profile.as_ref().map(|p| (env.platform(), p));

    let result = env
        .inner
        .discoverer(env.ctx)
        .discover(&handle, platforms, seed)
        .await;

    dossier.connected_accounts = result
        .found()
        .filter(|(platform, _)| platform.as_str() != env.platform())
        .filter_map(|(platform, found)| {
            let profile = found.profile.as_ref()?;
            Some(ConnectedAccount {
                platform: platform.clone(),
                username: profile.username.clone(),
                display_name: profile.display_name.clone(),
                confidence: found.confidence,
            })
        })
        .collect();
    dossier.cross_platform = Some(result);
}
