//! Shared data model, platform registry and configuration for dossier
//! collection.

pub mod app_config;
pub mod config;
pub mod discovery;
pub mod dossier;
pub mod error;
pub mod footprint;
pub mod platforms;
pub mod profile;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config_from_env, parse_platform_list};
pub use discovery::{AggregatorLink, DiscoveryResult, PlatformMatch, PotentialMatch};
pub use dossier::{
    CollectionMode, CollectionStage, CollectionStats, CommentSample, ConnectedAccount, Dossier,
    Resolution, ResolutionMethod, SocialGraph,
};
pub use error::{ConfigError, RegistryError};
pub use footprint::{CollectionTarget, Footprint, PlatformFailure, PlatformValue, UnifiedProfile};
pub use platforms::{
    ContentKey, GraphDirection, PlatformCapability, PlatformCapabilityRegistry, ResultSlot,
    SecondaryOperation,
};
pub use profile::{
    AccountRef, Comment, ContentItem, DemographicEstimate, Demographics, ProfileRecord, Transcript,
};
