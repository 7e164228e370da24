use dossier_core::{CollectionStage, Dossier};

use super::{routing, RunEnv};

/// Profile, then one bounded batch from the primary content operation.
/// No identity resolution: a failed profile fetch ends the scan.
pub(super) async fn run(env: RunEnv<'_>, dossier: &mut Dossier) {
    if !env.enter(dossier, CollectionStage::ProfileFetch) {
        return;
    }
    let handle = dossier.username.clone();
    match routing::fetch_profile(env, &handle).await {
        Ok(profile) => dossier.profile = Some(profile),
        Err(failure) => {
            failure.record(env, dossier);
            return;
        }
    }

    if !env.enter(dossier, CollectionStage::SecondaryFetch) {
        return;
    }
    let Some(primary) = env.capability.primary_content() else {
        tracing::debug!(platform = env.platform(), "no content operation for quick scan");
        return;
    };
    let batch = env.config().quick_batch_size;
    let op = primary.with_count(batch);
    let key = routing::content_key(env, dossier);
    if let Some(outcome) = routing::fetch_secondary(env, &op, &key).await {
        let budget = env.config().content_budget.min(batch);
        routing::apply(env, dossier, &op, outcome, budget);
    }
}
