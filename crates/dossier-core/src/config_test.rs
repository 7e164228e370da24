use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("DOSSIER_PROVIDER_URL", "http://localhost:8080");
    m
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "DOSSIER_ENV"));
}

#[test]
fn build_app_config_fails_without_provider_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "DOSSIER_PROVIDER_URL"),
        "expected MissingEnvVar(DOSSIER_PROVIDER_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_provider_url_as_missing() {
    let mut map = HashMap::new();
    map.insert("DOSSIER_PROVIDER_URL", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_succeeds_with_all_required_vars() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.provider_url, "http://localhost:8080");
    assert!(cfg.provider_api_key.is_none());
    assert!(cfg.platforms_path.is_none());
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "dossier/0.1 (profile-intelligence)");
    assert_eq!(cfg.min_request_interval_ms, 1000);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retry_backoff_base_ms, 1000);
    assert_eq!(cfg.rate_limit_calls, 60);
    assert_eq!(cfg.rate_limit_window_secs, 60);
    assert_eq!(cfg.max_concurrent_platforms, 3);
    assert_eq!(cfg.max_concurrent_operations, 4);
    assert_eq!(cfg.content_budget, 200);
    assert_eq!(cfg.quick_deadline_secs, 10);
    assert_eq!(cfg.deep_deadline_secs, 300);
    assert_eq!(
        cfg.discovery_platforms,
        vec!["tiktok", "instagram", "youtube", "twitter", "twitch", "reddit", "linktree"]
    );
}

#[test]
fn debug_output_redacts_api_key() {
    let mut map = full_env();
    map.insert("DOSSIER_PROVIDER_API_KEY", "super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("[redacted]"));
}

#[test]
fn max_retries_override() {
    let mut map = full_env();
    map.insert("DOSSIER_MAX_RETRIES", "5");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.max_retries, 5);
}

#[test]
fn max_retries_invalid() {
    let mut map = full_env();
    map.insert("DOSSIER_MAX_RETRIES", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DOSSIER_MAX_RETRIES"),
        "expected InvalidEnvVar(DOSSIER_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn content_budget_rejects_zero() {
    let mut map = full_env();
    map.insert("DOSSIER_CONTENT_BUDGET", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DOSSIER_CONTENT_BUDGET"),
        "expected InvalidEnvVar(DOSSIER_CONTENT_BUDGET), got: {result:?}"
    );
}

#[test]
fn rate_limit_calls_override() {
    let mut map = full_env();
    map.insert("DOSSIER_RATE_LIMIT_CALLS", "10");
    map.insert("DOSSIER_RATE_LIMIT_WINDOW_SECS", "1");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.rate_limit_calls, 10);
    assert_eq!(cfg.rate_limit_window_secs, 1);
}

#[test]
fn deep_deadline_invalid() {
    let mut map = full_env();
    map.insert("DOSSIER_DEEP_DEADLINE_SECS", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DOSSIER_DEEP_DEADLINE_SECS")
    );
}

#[test]
fn platforms_path_is_read_when_set() {
    let mut map = full_env();
    map.insert("DOSSIER_PLATFORMS_PATH", "./config/platforms.yaml");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.platforms_path.as_deref(),
        Some(std::path::Path::new("./config/platforms.yaml"))
    );
}

#[test]
fn discovery_platforms_override_is_normalized() {
    let mut map = full_env();
    map.insert("DOSSIER_DISCOVERY_PLATFORMS", " TikTok, ,youtube,tiktok ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.discovery_platforms, vec!["tiktok", "youtube"]);
}
