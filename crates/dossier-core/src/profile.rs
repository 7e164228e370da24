//! Records produced by individual provider calls: profiles, content, comments,
//! transcripts and demographic estimates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw keys that carry a follower-like counter on some platform.
const FOLLOWER_KEYS: &[&str] = &[
    "follower_count",
    "followers",
    "followerCount",
    "subscriber_count",
    "subscribers",
    "subscriberCount",
    "fans",
];

/// Raw keys that carry a post-like counter on some platform.
const POST_KEYS: &[&str] = &[
    "post_count",
    "posts",
    "media_count",
    "video_count",
    "videoCount",
    "tweet_count",
    "statuses_count",
    "product_count",
];

/// Public profile of one account on one platform.
///
/// Produced once per run by the profile-fetch step (or by identity
/// resolution) and never rewritten afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub platform: String,
    pub external_id: Option<String>,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub follower_count: Option<u64>,
    pub following_count: Option<u64>,
    pub post_count: Option<u64>,
    #[serde(default)]
    pub verified: bool,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub raw: Value,
}

impl ProfileRecord {
    /// Minimal record with only the platform and username populated.
    #[must_use]
    pub fn new(platform: &str, username: &str) -> Self {
        Self {
            platform: platform.to_string(),
            external_id: None,
            username: username.to_string(),
            display_name: None,
            bio: None,
            follower_count: None,
            following_count: None,
            post_count: None,
            verified: false,
            avatar_url: None,
            raw: Value::Null,
        }
    }

    /// Follower-like counter, falling back to platform-specific raw keys
    /// (`subscriber_count`, `fans`, ...) when the typed field is absent.
    #[must_use]
    pub fn followers_like(&self) -> Option<u64> {
        self.follower_count
            .or_else(|| first_counter(&self.raw, FOLLOWER_KEYS))
    }

    /// Post-like counter, falling back to platform-specific raw keys
    /// (`video_count`, `media_count`, ...) when the typed field is absent.
    #[must_use]
    pub fn posts_like(&self) -> Option<u64> {
        self.post_count.or_else(|| first_counter(&self.raw, POST_KEYS))
    }

    /// The identifier secondary fetches should be keyed by.
    #[must_use]
    pub fn content_key(&self, by_external_id: bool) -> &str {
        if by_external_id {
            self.external_id.as_deref().unwrap_or(&self.username)
        } else {
            &self.username
        }
    }
}

/// Reads the first present non-negative integer among `keys` in a JSON
/// object. Accepts numbers and numeric strings.
#[must_use]
pub fn first_counter(raw: &Value, keys: &[&str]) -> Option<u64> {
    let obj = raw.as_object()?;
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse::<u64>().ok(),
        _ => None,
    })
}

/// Lightweight reference to an account: a content author, a follower, or a
/// search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub username: String,
    pub display_name: Option<String>,
    pub external_id: Option<String>,
}

/// One piece of content (video, post, tweet, clip, product, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub platform: String,
    pub text: Option<String>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub views: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<AccountRef>,
    #[serde(default)]
    pub raw: Value,
}

impl ContentItem {
    #[must_use]
    pub fn new(platform: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            platform: platform.to_string(),
            text: None,
            likes: None,
            comments: None,
            shares: None,
            views: None,
            published_at: None,
            author: None,
            raw: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub item_id: String,
    pub author: Option<String>,
    pub text: String,
    pub likes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub item_id: String,
    pub text: String,
    pub language: Option<String>,
}

impl Transcript {
    /// Transcripts with only whitespace carry no signal and are skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Age/gender inferred from a profile image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicEstimate {
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    /// Audience breakdown reported by a platform's demographics operation.
    pub audience: Option<Value>,
    /// Estimate inferred from the profile avatar.
    pub estimate: Option<DemographicEstimate>,
}
