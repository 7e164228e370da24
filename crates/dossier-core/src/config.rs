use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Platforms checked by cross-platform discovery when the caller does not
/// name any.
pub const DEFAULT_DISCOVERY_PLATFORMS: &str = "tiktok,instagram,youtube,twitter,twitch,reddit,linktree";

/// Load application configuration from environment variables already in the process.
///
/// `.env` files are not read here; the binary loads them before parsing its
/// arguments.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_nonzero_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let provider_url = require("DOSSIER_PROVIDER_URL")?;
    let env = parse_environment(&or_default("DOSSIER_ENV", "development"))?;
    let log_level = or_default("DOSSIER_LOG_LEVEL", "info");
    let provider_api_key = lookup("DOSSIER_PROVIDER_API_KEY")
        .ok()
        .filter(|v| !v.trim().is_empty());
    let platforms_path = lookup("DOSSIER_PLATFORMS_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    let request_timeout_secs = parse_u64("DOSSIER_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("DOSSIER_USER_AGENT", "dossier/0.1 (profile-intelligence)");
    let min_request_interval_ms = parse_u64("DOSSIER_MIN_REQUEST_INTERVAL_MS", "1000")?;
    let max_retries = parse_u32("DOSSIER_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("DOSSIER_RETRY_BACKOFF_BASE_MS", "1000")?;
    let rate_limit_calls = parse_nonzero_usize("DOSSIER_RATE_LIMIT_CALLS", "60")?;
    let rate_limit_window_secs = parse_u64("DOSSIER_RATE_LIMIT_WINDOW_SECS", "60")?;
    let max_concurrent_platforms = parse_nonzero_usize("DOSSIER_MAX_CONCURRENT_PLATFORMS", "3")?;
    let max_concurrent_operations =
        parse_nonzero_usize("DOSSIER_MAX_CONCURRENT_OPERATIONS", "4")?;
    let content_budget = parse_nonzero_usize("DOSSIER_CONTENT_BUDGET", "200")?;
    let quick_deadline_secs = parse_u64("DOSSIER_QUICK_DEADLINE_SECS", "10")?;
    let deep_deadline_secs = parse_u64("DOSSIER_DEEP_DEADLINE_SECS", "300")?;
    let discovery_platforms = parse_platform_list(&or_default(
        "DOSSIER_DISCOVERY_PLATFORMS",
        DEFAULT_DISCOVERY_PLATFORMS,
    ));

    Ok(AppConfig {
        env,
        log_level,
        provider_url,
        provider_api_key,
        platforms_path,
        request_timeout_secs,
        user_agent,
        min_request_interval_ms,
        max_retries,
        retry_backoff_base_ms,
        rate_limit_calls,
        rate_limit_window_secs,
        max_concurrent_platforms,
        max_concurrent_operations,
        content_budget,
        quick_deadline_secs,
        deep_deadline_secs,
        discovery_platforms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DOSSIER_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Split a comma-separated platform list, lower-casing and dropping blanks
/// and duplicates while keeping the first-seen order.
#[must_use]
pub fn parse_platform_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
    {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
