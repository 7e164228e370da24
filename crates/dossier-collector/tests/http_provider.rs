//! Integration tests for `HttpProvider` using wiremock HTTP mocks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dossier_collector::{
    CollectionOrchestrator, CollectorConfig, ContentProvider, HttpProvider, ProviderError,
    ProviderRegistry, ResourcePayload, RetryPolicy,
};
use dossier_core::PlatformCapabilityRegistry;

fn registry() -> PlatformCapabilityRegistry {
    PlatformCapabilityRegistry::builtin().expect("built-in table is valid")
}

fn test_provider(base_url: &str) -> ProviderRegistry {
    HttpProvider::with_base_url(
        base_url,
        Some("test-key"),
        Duration::from_secs(5),
        "dossier-test",
        Duration::ZERO,
    )
    .expect("provider construction should not fail")
    .into_registry(&registry())
}

#[tokio::test]
async fn profile_fetch_authenticates_and_normalizes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tiktok/user_info"))
        .and(query_param("username", "creator"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "uniqueId": "creator",
                "id": "6800001",
                "nickname": "The Creator",
                "signature": "dance + food",
                "followerCount": 1200,
                "followingCount": "35",
                "videoCount": 88,
                "verified": true,
                "avatarLarger": "https://cdn.example.com/a.jpg"
            }
        })))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let fetcher = provider.profile_fetcher("tiktok").expect("tiktok profile route");
    let profile = fetcher.fetch_profile("creator").await.expect("should parse profile");

    assert_eq!(profile.platform, "tiktok");
    assert_eq!(profile.username, "creator");
    assert_eq!(profile.external_id.as_deref(), Some("6800001"));
    assert_eq!(profile.display_name.as_deref(), Some("The Creator"));
    assert_eq!(profile.bio.as_deref(), Some("dance + food"));
    assert_eq!(profile.follower_count, Some(1200));
    assert_eq!(profile.following_count, Some(35));
    assert_eq!(profile.post_count, Some(88));
    assert!(profile.verified);
    assert_eq!(
        profile.avatar_url.as_deref(),
        Some("https://cdn.example.com/a.jpg")
    );
}

#[tokio::test]
async fn statuses_map_onto_provider_errors() {
    let server = MockServer::start().await;
    let cases: [(&str, ResponseTemplate); 5] = [
        ("missing", ResponseTemplate::new(404)),
        (
            "throttled",
            ResponseTemplate::new(429).insert_header("Retry-After", "7"),
        ),
        ("denied", ResponseTemplate::new(401)),
        ("broken", ResponseTemplate::new(503)),
        ("teapot", ResponseTemplate::new(418)),
    ];
    for (handle, response) in cases {
        Mock::given(method("GET"))
            .and(path("/instagram/user_info"))
            .and(query_param("username", handle))
            .respond_with(response)
            .mount(&server)
            .await;
    }

    let provider = test_provider(&server.uri());
    let fetcher = provider.profile_fetcher("instagram").expect("instagram route");

    let err = fetcher.fetch_profile("missing").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");

    let err = fetcher.fetch_profile("throttled").await.unwrap_err();
    assert!(
        matches!(err, ProviderError::RateLimited { retry_after } if retry_after == Duration::from_secs(7)),
        "got {err:?}"
    );

    let err = fetcher.fetch_profile("denied").await.unwrap_err();
    assert!(matches!(err, ProviderError::Unauthorized(_)), "got {err:?}");

    let err = fetcher.fetch_profile("broken").await.unwrap_err();
    assert!(matches!(err, ProviderError::Upstream { status: 503 }), "got {err:?}");

    let err = fetcher.fetch_profile("teapot").await.unwrap_err();
    assert!(
        matches!(err, ProviderError::UnexpectedStatus { status: 418, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn secondary_fetch_passes_key_and_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tiktok/user_videos"))
        .and(query_param("id", "6800001"))
        .and(query_param("count", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "videos": [
                { "aweme_id": "a1", "desc": "first", "digg_count": 5, "create_time": 1_700_000_000 },
                { "aweme_id": "a2", "desc": "second", "play_count": "900" },
                { "desc": "no id, dropped" }
            ]
        })))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let fetcher = provider
        .content_fetcher("tiktok", "user_videos")
        .expect("videos route");
    let params = BTreeMap::from([("count".to_string(), json!(30))]);
    let payload = fetcher
        .fetch_content("6800001", &params)
        .await
        .expect("should parse videos");

    let ResourcePayload::Content(items) = payload else {
        panic!("expected content payload, got {payload:?}");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "a1");
    assert_eq!(items[0].likes, Some(5));
    assert!(items[0].published_at.is_some());
    assert_eq!(items[1].views, Some(900));
}

#[tokio::test]
async fn missing_transcript_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/video_transcript"))
        .and(query_param("item_id", "none"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/youtube/video_transcript"))
        .and(query_param("item_id", "vid1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "language": "en",
            "segments": [{ "text": "hello" }, { "text": "world" }]
        })))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let fetcher = provider.transcript_fetcher("youtube").expect("transcript route");

    assert!(fetcher.fetch_transcript("none").await.expect("404 is empty").is_none());
    let transcript = fetcher
        .fetch_transcript("vid1")
        .await
        .expect("should parse transcript")
        .expect("transcript present");
    assert_eq!(transcript.text, "hello world");
    assert_eq!(transcript.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn demographics_posts_image_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vision/demographics"))
        .and(body_json(json!({ "image_url": "https://cdn.example.com/a.jpg" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "estimated_age": 31, "gender": "male" }
        })))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let predictor = provider.demographics_predictor().expect("vision route");
    let estimate = predictor
        .predict("https://cdn.example.com/a.jpg")
        .await
        .expect("should parse estimate");

    assert_eq!(estimate.age, Some(31));
    assert_eq!(estimate.gender.as_deref(), Some("male"));
}

#[tokio::test]
async fn quick_scan_over_http_retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/twitter/user_info"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/twitter/user_info"))
        .and(query_param("username", "poster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "screen_name": "poster",
            "name": "Poster",
            "followers_count": 42
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/twitter/user_tweets"))
        .and(query_param("id", "poster"))
        .and(query_param("count", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "t1", "text": "gm" },
            { "id": "t2", "text": "gn" }
        ])))
        .mount(&server)
        .await;

    let config = CollectorConfig {
        retry: RetryPolicy::new(2, Duration::from_millis(1)),
        ..CollectorConfig::default()
    };
    let orchestrator = CollectionOrchestrator::new(
        Arc::new(registry()),
        Arc::new(test_provider(&server.uri())),
        config,
    );

    let dossier = orchestrator.quick_scan("twitter", "poster").await;

    assert!(dossier.errors.is_empty(), "errors: {:?}", dossier.errors);
    let profile = dossier.profile.as_ref().expect("profile collected");
    assert_eq!(profile.follower_count, Some(42));
    assert_eq!(dossier.content.len(), 2);
    assert_eq!(dossier.statistics.api_calls, 3);
}
