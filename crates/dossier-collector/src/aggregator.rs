//! Multi-platform footprint collection.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;

use dossier_core::{CollectionMode, CollectionTarget, Dossier, Footprint, PlatformFailure};

use crate::orchestrator::CollectionOrchestrator;

/// Runs the orchestrator once per (platform, handle) target and folds the
/// results into one [`Footprint`].
///
/// At most `max_concurrent_platforms` targets run at a time. A target that
/// panics or yields no profile lands in `platforms_failed`; the others are
/// unaffected. Profile-less dossiers are still kept in `dossiers`.
#[derive(Debug, Clone)]
pub struct FootprintAggregator {
    orchestrator: CollectionOrchestrator,
}

impl FootprintAggregator {
    #[must_use]
    pub fn new(orchestrator: CollectionOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub async fn collect(&self, targets: &[CollectionTarget], mode: CollectionMode) -> Footprint {
        let started = Instant::now();
        let targets = dedup_targets(targets);
        let concurrency = self.orchestrator.config().max_concurrent_platforms.max(1);
        tracing::info!(targets = targets.len(), %mode, concurrency, "collecting footprint");

        let outcomes: Vec<_> = stream::iter(targets)
            .map(|target| async move {
                let run = AssertUnwindSafe(self.orchestrator.collect(
                    mode,
                    &target.platform,
                    &target.handle,
                ))
                .catch_unwind()
                .await;
                (target, run)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut footprint = Footprint::new(mode);
        for (target, outcome) in outcomes {
            match outcome {
                Ok(dossier) => absorb(&mut footprint, &target, dossier),
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    tracing::error!(
                        platform = %target.platform,
                        handle = %target.handle,
                        %reason,
                        "collection task failed"
                    );
                    footprint.platforms_failed.push(PlatformFailure {
                        platform: target.platform,
                        error: format!("collection task failed: {reason}"),
                    });
                }
            }
        }

        footprint.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            collected = footprint.platforms_collected.len(),
            failed = footprint.platforms_failed.len(),
            total_api_calls = footprint.total_api_calls,
            elapsed_ms = footprint.elapsed_ms,
            "footprint complete"
        );
        footprint
    }
}

/// Folds one finished run into the footprint. Runs without a profile count
/// as failures, reported with their first error, but their partial dossier
/// is kept.
fn absorb(footprint: &mut Footprint, target: &CollectionTarget, dossier: Dossier) {
    footprint.total_api_calls = footprint
        .total_api_calls
        .saturating_add(dossier.statistics.api_calls);

    let Some(profile) = dossier.profile.as_ref() else {
        let error = dossier
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "no profile collected".to_string());
        tracing::warn!(platform = %target.platform, handle = %target.handle, %error, "platform failed");
        footprint.platforms_failed.push(PlatformFailure {
            platform: target.platform.clone(),
            error,
        });
        footprint.dossiers.insert(target.platform.clone(), dossier);
        return;
    };

    footprint.unified_profile.absorb(profile);
    footprint.platforms_collected.push(target.platform.clone());
    footprint.dossiers.insert(target.platform.clone(), dossier);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panicked".to_string()
    }
}

/// Keeps the first target per platform.
fn dedup_targets(targets: &[CollectionTarget]) -> Vec<CollectionTarget> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| {
            let fresh = seen.insert(t.platform.trim().to_lowercase());
            if !fresh {
                tracing::warn!(platform = %t.platform, "duplicate platform target ignored");
            }
            fresh
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_platforms_keep_first_handle() {
        let targets = vec![
            CollectionTarget::new("tiktok", "a"),
            CollectionTarget::new("instagram", "b"),
            CollectionTarget::new("tiktok", "c"),
        ];
        let deduped = dedup_targets(&targets);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].handle, "a");
        assert_eq!(deduped[1].platform, "instagram");
    }

    #[test]
    fn panic_payloads_render_as_text() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        let borrowed: Box<dyn Any + Send> = Box::new("bang");
        let opaque: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "boom");
        assert_eq!(panic_message(borrowed.as_ref()), "bang");
        assert_eq!(panic_message(opaque.as_ref()), "panicked");
    }
}
