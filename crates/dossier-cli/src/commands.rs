use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use dossier_collector::{
    CollectionOrchestrator, CollectorConfig, DeepOptions, FootprintAggregator, HttpProvider,
};
use dossier_core::{AppConfig, CollectionMode, CollectionTarget, PlatformCapabilityRegistry};

/// Loads the capability table from `path`, or the built-in table when no
/// path is given.
pub(crate) fn load_registry(path: Option<&Path>) -> anyhow::Result<PlatformCapabilityRegistry> {
    let registry = match path {
        Some(path) => PlatformCapabilityRegistry::load(path)
            .with_context(|| format!("loading platforms from {}", path.display()))?,
        None => PlatformCapabilityRegistry::builtin().context("loading built-in platforms")?,
    };
    Ok(registry)
}

/// Reads the process environment, starts logging and builds the
/// orchestrator. An explicit `platforms_file` wins over `DOSSIER_PLATFORMS_PATH`
/// from the config.
pub(crate) fn init(platforms_file: Option<PathBuf>) -> anyhow::Result<CollectionOrchestrator> {
    let config = dossier_core::load_app_config_from_env()?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let platforms_file = platforms_file.or_else(|| config.platforms_path.clone());
    build_orchestrator(&config, platforms_file.as_deref())
}

pub(crate) fn build_orchestrator(
    config: &AppConfig,
    platforms_file: Option<&Path>,
) -> anyhow::Result<CollectionOrchestrator> {
    let registry = load_registry(platforms_file)?;
    let provider = HttpProvider::new(config)
        .context("building provider gateway client")?
        .into_registry(&registry);
    tracing::info!(
        platforms = registry.len(),
        provider_url = %config.provider_url,
        "orchestrator ready"
    );
    Ok(CollectionOrchestrator::new(
        Arc::new(registry),
        Arc::new(provider),
        CollectorConfig::from_app_config(config),
    ))
}

pub(crate) fn list_platforms(registry: &PlatformCapabilityRegistry) -> anyhow::Result<()> {
    let entries: Vec<_> = registry.iter().collect();
    print_json(&entries)
}

pub(crate) async fn run_quick(
    orchestrator: &CollectionOrchestrator,
    platform: &str,
    handle: &str,
) -> anyhow::Result<()> {
    let dossier = orchestrator.quick_scan(platform, handle).await;
    print_json(&dossier)
}

pub(crate) async fn run_deep(
    orchestrator: &CollectionOrchestrator,
    platform: &str,
    handle: &str,
    options: &DeepOptions,
) -> anyhow::Result<()> {
    let dossier = orchestrator.deep_dossier(platform, handle, options).await;
    print_json(&dossier)
}

pub(crate) async fn run_footprint(
    orchestrator: CollectionOrchestrator,
    targets: &[CollectionTarget],
    mode: CollectionMode,
) -> anyhow::Result<()> {
    let footprint = FootprintAggregator::new(orchestrator)
        .collect(targets, mode)
        .await;
    print_json(&footprint)
}

pub(crate) async fn run_discover(
    orchestrator: &CollectionOrchestrator,
    handle: &str,
    platforms: Option<&[String]>,
) -> anyhow::Result<()> {
    let result = orchestrator.discover(handle, platforms).await;
    print_json(&result)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{rendered}");
    Ok(())
}
