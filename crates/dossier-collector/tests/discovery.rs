//! Cross-platform discovery through the orchestrator.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{orchestrator, profile, test_config, Profiles, Rejecting};
use dossier_collector::{CollectorConfig, DeepOptions, ProviderRegistry, MENTION_CONFIDENCE};
use dossier_core::{PlatformMatch, ProfileRecord};

fn platforms(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

#[tokio::test]
async fn lookups_record_found_and_not_found() {
    let provider = ProviderRegistry::builder()
        .profile("tiktok", Profiles::of(Vec::new()))
        .profile("instagram", Profiles::of(vec![profile("instagram", "Creator")]))
        .build();
    let orch = orchestrator(provider, test_config());

    let result = orch
        .discover("creator", Some(&platforms(&["tiktok", "instagram"])))
        .await;

    assert_eq!(result.search_handle, "creator");
    assert_eq!(result.platforms["tiktok"], PlatformMatch::not_found());
    let instagram = &result.platforms["instagram"];
    assert!(instagram.found);
    assert!((instagram.confidence - 1.0).abs() < f32::EPSILON);
    assert_eq!(result.found().count(), 1);
}

fn verified_only(_query: &str, found: &ProfileRecord) -> f32 {
    if found.verified {
        0.9
    } else {
        0.1
    }
}

#[tokio::test]
async fn configured_scorer_sets_match_confidence() {
    let mut verified = profile("instagram", "creator");
    verified.verified = true;
    let provider = ProviderRegistry::builder()
        .profile("instagram", Profiles::of(vec![verified]))
        .profile("twitch", Profiles::of(vec![profile("twitch", "creator")]))
        .build();
    let config = CollectorConfig {
        confidence_scorer: verified_only,
        ..test_config()
    };
    let orch = orchestrator(provider, config);

    let result = orch
        .discover("creator", Some(&platforms(&["instagram", "twitch"])))
        .await;

    assert!((result.platforms["instagram"].confidence - 0.9).abs() < f32::EPSILON);
    assert!((result.platforms["twitch"].confidence - 0.1).abs() < f32::EPSILON);
}

#[tokio::test]
async fn failed_and_unknown_platforms_are_omitted() {
    let provider = ProviderRegistry::builder()
        .profile("youtube", Arc::new(Rejecting))
        .profile("twitch", Profiles::of(vec![profile("twitch", "creator_tv")]))
        .build();
    let orch = orchestrator(provider, test_config());

    let result = orch
        .discover("creator", Some(&platforms(&["youtube", "myspace", "twitch", "reddit"])))
        .await;

    assert!(!result.platforms.contains_key("youtube"));
    assert!(!result.platforms.contains_key("myspace"));
    // No profile capability registered for reddit.
    assert!(!result.platforms.contains_key("reddit"));
    assert_eq!(result.platforms["twitch"], PlatformMatch::not_found());
}

#[tokio::test]
async fn link_aggregator_pages_yield_outbound_links() {
    let mut page = profile("linktree", "creator");
    page.raw = json!({
        "username": "creator",
        "avatar": "https://cdn.linktr.ee/avatar.png",
        "links": [
            { "title": "Channel", "url": "https://youtube.com/@creator" },
            { "title": "Shop", "url": "https://amzn.to/xyz", "thumbnail": "https://cdn/x.png" }
        ]
    });
    let provider = ProviderRegistry::builder()
        .profile("linktree", Profiles::of(vec![page]))
        .build();
    let orch = orchestrator(provider, test_config());

    let result = orch.discover("creator", Some(&platforms(&["linktree"]))).await;

    let urls: Vec<&str> = result.links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(urls, vec!["https://youtube.com/@creator", "https://amzn.to/xyz"]);
    assert!(result.links.iter().all(|l| l.source_platform == "linktree"));
}

#[tokio::test]
async fn bio_mentions_suggest_unconfirmed_platforms() {
    let mut ig = profile("instagram", "creator");
    ig.bio = Some("Live most nights on Twitch @creator_live".to_string());
    let provider = ProviderRegistry::builder()
        .profile("instagram", Profiles::of(vec![ig]))
        .build();
    let orch = orchestrator(provider, test_config());

    let result = orch.discover("creator", Some(&platforms(&["instagram"]))).await;

    assert_eq!(result.potential_matches.len(), 1);
    let hint = &result.potential_matches[0];
    assert_eq!(hint.platform, "twitch");
    assert_eq!(hint.source_platform, "instagram");
    assert_eq!(hint.suggested_handle.as_deref(), Some("creator_live"));
    assert!((hint.confidence - MENTION_CONFIDENCE).abs() < f32::EPSILON);
}

#[tokio::test]
async fn deep_discovery_turns_matches_into_connected_accounts() {
    let provider = ProviderRegistry::builder()
        .profile("tiktok", Profiles::of(vec![profile("tiktok", "creator")]))
        .profile("instagram", Profiles::of(vec![profile("instagram", "creator")]))
        .profile("youtube", Profiles::of(Vec::new()))
        .build();
    let orch = orchestrator(provider, test_config());
    let options = DeepOptions {
        discovery_platforms: Some(platforms(&["tiktok", "instagram", "youtube"])),
        ..DeepOptions::default()
    };

    let dossier = orch.deep_dossier("tiktok", "creator", &options).await;

    let discovery = dossier.cross_platform.as_ref().expect("discovery ran");
    assert!(discovery.platforms["tiktok"].found);
    assert!(!discovery.platforms["youtube"].found);
    assert_eq!(dossier.connected_accounts.len(), 1);
    assert_eq!(dossier.connected_accounts[0].platform, "instagram");
    assert_eq!(dossier.connected_accounts[0].username, "creator");
    // The seed platform is never looked up again.
    assert_eq!(dossier.statistics.api_calls, 3);
}
