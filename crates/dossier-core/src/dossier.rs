//! The dossier: aggregate output of one collection run for one
//! (platform, handle) pair.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::discovery::DiscoveryResult;
use crate::profile::{AccountRef, Comment, ContentItem, Demographics, ProfileRecord, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMode {
    Quick,
    Deep,
}

impl std::fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionMode::Quick => write!(f, "quick"),
            CollectionMode::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for CollectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(CollectionMode::Quick),
            "deep" => Ok(CollectionMode::Deep),
            other => Err(format!("unknown collection mode '{other}'")),
        }
    }
}

/// Stages of one run, in execution order. Every stage is entered regardless
/// of failures in earlier stages; only the run deadline stops progression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStage {
    #[default]
    NotStarted,
    ProfileFetch,
    SecondaryFetch,
    Comments,
    Transcripts,
    Demographics,
    CrossDiscovery,
    Done,
}

impl std::fmt::Display for CollectionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CollectionStage::NotStarted => "not_started",
            CollectionStage::ProfileFetch => "profile_fetch",
            CollectionStage::SecondaryFetch => "secondary_fetch",
            CollectionStage::Comments => "comments",
            CollectionStage::Transcripts => "transcripts",
            CollectionStage::Demographics => "demographics",
            CollectionStage::CrossDiscovery => "cross_discovery",
            CollectionStage::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Every external call attempt, retries and discovery lookups included.
    pub api_calls: u32,
    pub content_items: usize,
    pub comments_collected: usize,
    pub transcripts_collected: usize,
    pub elapsed_ms: u64,
    pub stage: CollectionStage,
    pub deadline_exceeded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentSample {
    pub items: Vec<Comment>,
    /// Running total of every comment fetched, including those beyond the
    /// sample cap.
    pub total_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialGraph {
    pub followers: Vec<AccountRef>,
    pub following: Vec<AccountRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// The search returned an account/channel match.
    Channel,
    /// Only content matched; the profile was synthesized from its author.
    ContentAuthor,
}

/// Records that identity resolution replaced the caller's handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub original_handle: String,
    pub resolved_handle: String,
    pub method: ResolutionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub platform: String,
    pub username: String,
    pub display_name: Option<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub run_id: Uuid,
    pub collected_at: DateTime<Utc>,
    pub mode: CollectionMode,
    pub platform: String,
    /// Handle of record: the resolved handle when resolution occurred.
    pub username: String,
    /// Handle exactly as supplied by the caller.
    pub requested_handle: String,
    pub resolution: Option<Resolution>,
    pub profile: Option<ProfileRecord>,
    pub content: Vec<ContentItem>,
    pub demographics: Option<Demographics>,
    pub comments: CommentSample,
    pub transcripts: Vec<Transcript>,
    pub social_graph: SocialGraph,
    pub additional_data: BTreeMap<String, Value>,
    pub cross_platform: Option<DiscoveryResult>,
    pub connected_accounts: Vec<ConnectedAccount>,
    pub errors: Vec<String>,
    pub statistics: CollectionStats,
}

impl Dossier {
    #[must_use]
    pub fn new(mode: CollectionMode, platform: &str, handle: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            collected_at: Utc::now(),
            mode,
            platform: platform.to_string(),
            username: handle.to_string(),
            requested_handle: handle.to_string(),
            resolution: None,
            profile: None,
            content: Vec::new(),
            demographics: None,
            comments: CommentSample::default(),
            transcripts: Vec::new(),
            social_graph: SocialGraph::default(),
            additional_data: BTreeMap::new(),
            cross_platform: None,
            connected_accounts: Vec::new(),
            errors: Vec::new(),
            statistics: CollectionStats::default(),
        }
    }

    /// A dossier for a platform missing from the registry: exactly one error
    /// entry, every other field left at its default.
    #[must_use]
    pub fn unsupported(mode: CollectionMode, platform: &str, handle: &str) -> Self {
        let mut dossier = Self::new(mode, platform, handle);
        dossier
            .errors
            .push(format!("unsupported platform: {platform}"));
        dossier
    }

    /// Appends items in order until `budget` content items are held. Returns
    /// how many were appended.
    pub fn push_content(&mut self, items: Vec<ContentItem>, budget: usize) -> usize {
        let room = budget.saturating_sub(self.content.len());
        let before = self.content.len();
        self.content.extend(items.into_iter().take(room));
        self.content.len() - before
    }

    /// Appends a human-readable error entry tagged with the platform and the
    /// resource that failed.
    pub fn record_error(&mut self, resource: &str, error: impl std::fmt::Display) {
        self.errors
            .push(format!("[{}] {resource}: {error}", self.platform));
    }

    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.profile.is_some()
    }
}
