//! Provider calls shared by both modes, and routing of secondary results
//! into dossier slots.

use dossier_core::{
    ContentKey, Demographics, Dossier, GraphDirection, ProfileRecord, ResultSlot,
    SecondaryOperation,
};
use serde_json::Value;

use super::RunEnv;
use crate::dispatch::CallResult;
use crate::error::ProviderError;
use crate::provider::ResourcePayload;
use crate::retry::RetryError;

/// Why the profile step produced no profile.
pub(super) enum ProfileFailure {
    /// The provider exposes no profile capability for the platform.
    Unavailable,
    Call(RetryError<ProviderError>),
}

impl ProfileFailure {
    pub(super) fn record(&self, env: RunEnv<'_>, dossier: &mut Dossier) {
        match self {
            ProfileFailure::Unavailable => {
                tracing::warn!(platform = env.platform(), "no profile capability registered");
                dossier.record_error(
                    "profile",
                    format!(
                        "operation '{}' not available from provider",
                        env.capability.profile_operation
                    ),
                );
            }
            ProfileFailure::Call(err) => env.fail(dossier, "profile", err),
        }
    }
}

pub(super) async fn fetch_profile(
    env: RunEnv<'_>,
    handle: &str,
) -> Result<ProfileRecord, ProfileFailure> {
    let fetcher = env
        .provider()
        .profile_fetcher(env.platform())
        .ok_or(ProfileFailure::Unavailable)?;
    env.call(&env.capability.profile_operation, || {
        fetcher.fetch_profile(handle)
    })
    .await
    .map_err(ProfileFailure::Call)
}

/// Identifier secondary fetches are keyed by: the profile's internal id for
/// `external_id` platforms when known, otherwise the working handle.
pub(super) fn content_key(env: RunEnv<'_>, dossier: &Dossier) -> String {
    let by_external_id = env.capability.content_key == ContentKey::ExternalId;
    dossier.profile.as_ref().map_or_else(
        || dossier.username.clone(),
        |p| p.content_key(by_external_id).to_string(),
    )
}

/// Runs one secondary operation. `None` when the provider has no
/// implementation for it, which is not an error.
pub(super) async fn fetch_secondary(
    env: RunEnv<'_>,
    op: &SecondaryOperation,
    key: &str,
) -> Option<CallResult<ResourcePayload>> {
    let Some(fetcher) = env.provider().content_fetcher(env.platform(), &op.operation) else {
        tracing::debug!(
            platform = env.platform(),
            operation = %op.operation,
            "operation not provided, skipping"
        );
        return None;
    };
    let outcome = env
        .call(&op.operation, || fetcher.fetch_content(key, &op.params))
        .await;
    Some(outcome)
}

/// Records a failed secondary fetch, or routes its payload.
pub(super) fn apply(
    env: RunEnv<'_>,
    dossier: &mut Dossier,
    op: &SecondaryOperation,
    outcome: CallResult<ResourcePayload>,
    content_budget: usize,
) {
    match outcome {
        Ok(payload) => route(dossier, op, payload, content_budget, env.config().social_graph_cap),
        Err(err) => env.fail(dossier, &op.result_key, &err),
    }
}

/// Places `payload` in the slot its result key classifies into. A payload
/// whose shape does not fit that slot lands in `additional_data`.
fn route(
    dossier: &mut Dossier,
    op: &SecondaryOperation,
    payload: ResourcePayload,
    content_budget: usize,
    graph_cap: usize,
) {
    match (op.slot(), payload) {
        (ResultSlot::Content, ResourcePayload::Content(items)) => {
            let fetched = items.len();
            let added = dossier.push_content(items, content_budget);
            if added < fetched {
                tracing::debug!(
                    result_key = %op.result_key,
                    fetched,
                    added,
                    "content budget reached"
                );
            }
        }
        (ResultSlot::SocialGraph(direction), ResourcePayload::Accounts(accounts)) => {
            let list = match direction {
                GraphDirection::Followers => &mut dossier.social_graph.followers,
                GraphDirection::Following => &mut dossier.social_graph.following,
            };
            let room = graph_cap.saturating_sub(list.len());
            list.extend(accounts.into_iter().take(room));
        }
        (ResultSlot::Demographics, ResourcePayload::Data(audience)) => {
            dossier
                .demographics
                .get_or_insert_with(Demographics::default)
                .audience = Some(audience);
        }
        (_, payload) => {
            dossier
                .additional_data
                .insert(op.result_key.clone(), payload_json(payload));
        }
    }
}

fn payload_json(payload: ResourcePayload) -> Value {
    let value = match payload {
        ResourcePayload::Data(v) => return v,
        ResourcePayload::Content(items) => serde_json::to_value(items),
        ResourcePayload::Accounts(accounts) => serde_json::to_value(accounts),
    };
    value.unwrap_or_default()
}
