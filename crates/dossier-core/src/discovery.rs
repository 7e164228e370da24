use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::ProfileRecord;

/// Outcome of probing one platform with the searched handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMatch {
    pub found: bool,
    pub profile: Option<ProfileRecord>,
    /// Opaque score in `[0, 1]`.
    pub confidence: f32,
}

impl PlatformMatch {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            found: false,
            profile: None,
            confidence: 0.0,
        }
    }
}

/// A platform mentioned in a confirmed profile's bio that was not itself
/// confirmed by probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialMatch {
    pub platform: String,
    pub source_platform: String,
    /// Bio excerpt surrounding the mention.
    pub evidence: String,
    pub suggested_handle: Option<String>,
    pub confidence: f32,
}

/// Outbound link harvested from a link-aggregator page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorLink {
    pub source_platform: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub search_handle: String,
    pub platforms: BTreeMap<String, PlatformMatch>,
    pub potential_matches: Vec<PotentialMatch>,
    pub links: Vec<AggregatorLink>,
}

impl DiscoveryResult {
    #[must_use]
    pub fn new(search_handle: &str) -> Self {
        Self {
            search_handle: search_handle.to_string(),
            ..Self::default()
        }
    }

    /// Platforms looked up successfully, in key order.
    pub fn found(&self) -> impl Iterator<Item = (&String, &PlatformMatch)> {
        self.platforms.iter().filter(|(_, m)| m.found)
    }
}
