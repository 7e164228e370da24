//! Platform capability registry.
//!
//! An immutable table, built once at startup from YAML, describing which
//! provider operations exist for each platform. Collection looks platforms up
//! by key and fails fast with [`RegistryError::UnsupportedPlatform`] for keys
//! the table does not contain.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RegistryError;

const DEFAULT_PLATFORMS_YAML: &str = include_str!("../../../config/platforms.yaml");

/// Which identifier secondary and comment fetches are keyed by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKey {
    #[default]
    Handle,
    /// The platform indexes content by internal account id; fall back to the
    /// handle when the profile carries no id.
    ExternalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphDirection {
    Followers,
    Following,
}

/// Dossier slot a secondary operation's result is routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSlot {
    SocialGraph(GraphDirection),
    Demographics,
    Content,
    Additional,
}

impl ResultSlot {
    /// Fixed classification of operation result keys.
    #[must_use]
    pub fn classify(result_key: &str) -> Self {
        match result_key {
            "followers" => ResultSlot::SocialGraph(GraphDirection::Followers),
            "following" => ResultSlot::SocialGraph(GraphDirection::Following),
            "demographics" => ResultSlot::Demographics,
            "videos" | "posts" | "reels" | "shorts" | "tweets" | "clips" | "products"
            | "tracks" | "stories" | "user_comments" => ResultSlot::Content,
            _ => ResultSlot::Additional,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryOperation {
    pub result_key: String,
    pub operation: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl SecondaryOperation {
    #[must_use]
    pub fn slot(&self) -> ResultSlot {
        ResultSlot::classify(&self.result_key)
    }

    /// The `count` parameter, when present and numeric.
    #[must_use]
    pub fn count(&self) -> Option<usize> {
        self.params
            .get("count")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Copy of this operation with `count` replaced.
    #[must_use]
    pub fn with_count(&self, count: usize) -> Self {
        let mut op = self.clone();
        op.params.insert("count".to_string(), Value::from(count));
        op
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformCapability {
    pub key: String,
    pub name: String,
    pub profile_operation: String,
    #[serde(default)]
    pub secondary: Vec<SecondaryOperation>,
    pub comment_operation: Option<String>,
    pub transcript_operation: Option<String>,
    pub search_operation: Option<String>,
    #[serde(default)]
    pub content_key: ContentKey,
    #[serde(default)]
    pub link_aggregator: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl PlatformCapability {
    /// First secondary operation whose result is content; Quick mode's only
    /// content fetch.
    #[must_use]
    pub fn primary_content(&self) -> Option<&SecondaryOperation> {
        self.secondary
            .iter()
            .find(|op| op.slot() == ResultSlot::Content)
    }

    /// Lower-cased words that identify this platform in free text.
    #[must_use]
    pub fn mention_terms(&self) -> Vec<String> {
        let mut terms = vec![self.key.to_lowercase(), self.name.to_lowercase()];
        terms.extend(self.aliases.iter().map(|a| a.to_lowercase()));
        terms.retain(|t| !t.trim().is_empty());
        terms.dedup();
        terms
    }
}

#[derive(Debug, Deserialize)]
struct PlatformsFile {
    platforms: Vec<PlatformCapability>,
}

/// Validated, read-only platform table. Entries live in one vector and are
/// looked up through a key index.
#[derive(Debug, Clone)]
pub struct PlatformCapabilityRegistry {
    entries: Vec<PlatformCapability>,
    index: HashMap<String, usize>,
}

impl PlatformCapabilityRegistry {
    /// Builds a registry from already-parsed capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for empty or duplicate keys,
    /// empty operation names, or duplicate result keys within a platform.
    pub fn new(mut entries: Vec<PlatformCapability>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, cap) in entries.iter_mut().enumerate() {
            cap.key = normalize_key(&cap.key);
            validate_capability(cap)?;
            if index.insert(cap.key.clone(), i).is_some() {
                return Err(RegistryError::Validation(format!(
                    "duplicate platform key: '{}'",
                    cap.key
                )));
            }
        }
        Ok(Self { entries, index })
    }

    /// Parses and validates a YAML `platforms:` document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] on malformed YAML or
    /// [`RegistryError::Validation`] if the table is inconsistent.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: PlatformsFile = serde_yaml::from_str(yaml)?;
        Self::new(file.platforms)
    }

    /// Loads the registry from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] if the file cannot be read, plus any
    /// error from [`Self::from_yaml_str`].
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// The table embedded at build time from `config/platforms.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded table is invalid.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_yaml_str(DEFAULT_PLATFORMS_YAML)
    }

    /// Looks up a platform by key (trimmed, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedPlatform`] if the key is unknown.
    pub fn get(&self, key: &str) -> Result<&PlatformCapability, RegistryError> {
        let normalized = normalize_key(key);
        self.index
            .get(&normalized)
            .map(|&i| &self.entries[i])
            .ok_or(RegistryError::UnsupportedPlatform(normalized))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&normalize_key(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformCapability> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical form of a platform key.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn validate_capability(cap: &PlatformCapability) -> Result<(), RegistryError> {
    if cap.key.is_empty() {
        return Err(RegistryError::Validation(
            "platform key must be non-empty".to_string(),
        ));
    }
    if cap.profile_operation.trim().is_empty() {
        return Err(RegistryError::Validation(format!(
            "platform '{}' has an empty profile_operation",
            cap.key
        )));
    }

    let optional_ops = [
        ("comment_operation", &cap.comment_operation),
        ("transcript_operation", &cap.transcript_operation),
        ("search_operation", &cap.search_operation),
    ];
    for (field, op) in optional_ops {
        if op.as_deref().is_some_and(|o| o.trim().is_empty()) {
            return Err(RegistryError::Validation(format!(
                "platform '{}' has an empty {field}",
                cap.key
            )));
        }
    }

    let mut seen = HashSet::new();
    for op in &cap.secondary {
        if op.operation.trim().is_empty() || op.result_key.trim().is_empty() {
            return Err(RegistryError::Validation(format!(
                "platform '{}' has a secondary operation with an empty name or result key",
                cap.key
            )));
        }
        if !seen.insert(op.result_key.as_str()) {
            return Err(RegistryError::Validation(format!(
                "platform '{}' has duplicate result key '{}'",
                cap.key, op.result_key
            )));
        }
    }
    Ok(())
}
