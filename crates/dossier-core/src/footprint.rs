//! Multi-platform footprint: per-platform dossiers plus a unified summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dossier::{CollectionMode, Dossier};
use crate::profile::ProfileRecord;

/// A value tagged with the platform it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformValue {
    pub platform: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedProfile {
    pub display_names: Vec<PlatformValue>,
    pub bios: Vec<PlatformValue>,
    pub total_followers: u64,
    pub total_posts: u64,
    pub verified: bool,
}

impl UnifiedProfile {
    /// Folds one platform's profile into the summary.
    pub fn absorb(&mut self, profile: &ProfileRecord) {
        if let Some(name) = non_empty(profile.display_name.as_deref()) {
            self.display_names.push(PlatformValue {
                platform: profile.platform.clone(),
                value: name.to_string(),
            });
        }
        if let Some(bio) = non_empty(profile.bio.as_deref()) {
            self.bios.push(PlatformValue {
                platform: profile.platform.clone(),
                value: bio.to_string(),
            });
        }
        if let Some(n) = profile.followers_like() {
            self.total_followers = self.total_followers.saturating_add(n);
        }
        if let Some(n) = profile.posts_like() {
            self.total_posts = self.total_posts.saturating_add(n);
        }
        self.verified |= profile.verified;
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFailure {
    pub platform: String,
    pub error: String,
}

/// (platform, handle) pair requested from the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTarget {
    pub platform: String,
    pub handle: String,
}

impl CollectionTarget {
    #[must_use]
    pub fn new(platform: &str, handle: &str) -> Self {
        Self {
            platform: platform.to_string(),
            handle: handle.to_string(),
        }
    }
}

impl std::str::FromStr for CollectionTarget {
    type Err = String;

    /// Parses `platform=handle`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (platform, handle) = s
            .split_once('=')
            .ok_or_else(|| format!("expected platform=handle, got '{s}'"))?;
        let platform = platform.trim().to_lowercase();
        let handle = handle.trim();
        if platform.is_empty() || handle.is_empty() {
            return Err(format!("expected platform=handle, got '{s}'"));
        }
        Ok(Self::new(&platform, handle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub mode: CollectionMode,
    /// Platforms with a collected profile, in request order.
    pub platforms_collected: Vec<String>,
    pub platforms_failed: Vec<PlatformFailure>,
    /// Every finished run, including profile-less partial ones.
    pub dossiers: BTreeMap<String, Dossier>,
    pub unified_profile: UnifiedProfile,
    pub total_api_calls: u32,
    pub elapsed_ms: u64,
}

impl Footprint {
    #[must_use]
    pub fn new(mode: CollectionMode) -> Self {
        Self {
            mode,
            platforms_collected: Vec::new(),
            platforms_failed: Vec::new(),
            dossiers: BTreeMap::new(),
            unified_profile: UnifiedProfile::default(),
            total_api_calls: 0,
            elapsed_ms: 0,
        }
    }
}
