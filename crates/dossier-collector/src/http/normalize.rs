//! Normalization from heterogeneous gateway JSON to the dossier data model.
//!
//! Upstream platforms name the same field differently (`followers`,
//! `follower_count`, `subscriberCount`, ...). Every extractor takes an
//! ordered list of candidate keys and uses the first one present.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use dossier_core::profile::first_counter;
use dossier_core::{
    AccountRef, Comment, ContentItem, DemographicEstimate, ProfileRecord, ResultSlot, Transcript,
};

use crate::error::ProviderError;
use crate::provider::{ResourcePayload, SearchResults};

const USERNAME_KEYS: &[&str] = &[
    "username",
    "unique_id",
    "uniqueId",
    "handle",
    "screen_name",
    "login",
    "custom_url",
];
const ID_KEYS: &[&str] = &[
    "id",
    "user_id",
    "userId",
    "channel_id",
    "channelId",
    "sec_uid",
    "pk",
];
const DISPLAY_NAME_KEYS: &[&str] = &[
    "display_name",
    "displayName",
    "full_name",
    "nickname",
    "title",
    "name",
];
const BIO_KEYS: &[&str] = &["bio", "biography", "description", "signature", "about"];
const FOLLOWER_KEYS: &[&str] = &[
    "follower_count",
    "followers_count",
    "followerCount",
    "subscriber_count",
    "subscriberCount",
    "followers",
    "subscribers",
];
const FOLLOWING_KEYS: &[&str] = &[
    "following_count",
    "followingCount",
    "friends_count",
    "following",
];
const POST_KEYS: &[&str] = &[
    "post_count",
    "media_count",
    "video_count",
    "videoCount",
    "statuses_count",
    "tweet_count",
    "posts",
];
const VERIFIED_KEYS: &[&str] = &["verified", "is_verified", "isVerified"];
const AVATAR_KEYS: &[&str] = &[
    "avatar_url",
    "avatar",
    "profile_pic_url",
    "profile_image_url",
    "avatarLarger",
    "thumbnail",
];

const ITEM_ID_KEYS: &[&str] = &["id", "video_id", "aweme_id", "post_id", "item_id", "shortcode"];
const TEXT_KEYS: &[&str] = &["text", "desc", "caption", "title", "description", "body"];
const LIKE_KEYS: &[&str] = &["likes", "like_count", "likeCount", "digg_count", "favorite_count"];
const COMMENT_COUNT_KEYS: &[&str] = &["comment_count", "commentCount", "reply_count", "comments"];
const SHARE_KEYS: &[&str] = &["shares", "share_count", "shareCount", "retweet_count"];
const VIEW_KEYS: &[&str] = &["views", "view_count", "viewCount", "play_count", "playCount"];
const TIME_KEYS: &[&str] = &[
    "published_at",
    "publishedAt",
    "created_at",
    "create_time",
    "createTime",
    "timestamp",
];
const AUTHOR_KEYS: &[&str] = &["author", "user", "owner", "channel"];

/// Wrapper keys under which a list of records may be nested.
const LIST_KEYS: &[&str] = &[
    "items", "videos", "posts", "results", "users", "accounts", "comments", "list", "content",
];

/// Strips a `{"data": ...}` envelope if present.
#[must_use]
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Normalizes a profile payload. `requested` is used when the payload
/// carries no recognizable username.
///
/// # Errors
///
/// Returns [`ProviderError::Other`] if the payload is not a JSON object.
pub fn profile(platform: &str, requested: &str, value: Value) -> Result<ProfileRecord, ProviderError> {
    let value = unwrap_envelope(value);
    let Some(obj) = value.as_object() else {
        return Err(ProviderError::Other(format!(
            "{platform} profile payload is not an object"
        )));
    };

    let username = string_field(obj, USERNAME_KEYS).unwrap_or_else(|| requested.to_string());
    let mut record = ProfileRecord::new(platform, username.trim_start_matches('@'));
    record.external_id = id_field(obj, ID_KEYS);
    record.display_name = string_field(obj, DISPLAY_NAME_KEYS);
    record.bio = string_field(obj, BIO_KEYS);
    record.follower_count = first_counter(&value, FOLLOWER_KEYS);
    record.following_count = first_counter(&value, FOLLOWING_KEYS);
    record.post_count = first_counter(&value, POST_KEYS);
    record.verified = bool_field(obj, VERIFIED_KEYS);
    record.avatar_url = string_field(obj, AVATAR_KEYS);
    record.raw = value;
    Ok(record)
}

/// Shapes a secondary-operation payload for the slot its result key
/// routes to. Anything that does not parse as that shape is kept as data.
#[must_use]
pub fn secondary(platform: &str, slot: ResultSlot, value: Value) -> ResourcePayload {
    let value = unwrap_envelope(value);
    match slot {
        ResultSlot::Content => match list(&value) {
            Some(items) => ResourcePayload::Content(
                items.iter().filter_map(|v| content_item(platform, v)).collect(),
            ),
            None => ResourcePayload::Data(value),
        },
        ResultSlot::SocialGraph(_) => match list(&value) {
            Some(items) => ResourcePayload::Accounts(items.iter().filter_map(account_ref).collect()),
            None => ResourcePayload::Data(value),
        },
        ResultSlot::Demographics | ResultSlot::Additional => ResourcePayload::Data(value),
    }
}

#[must_use]
pub fn content_item(platform: &str, value: &Value) -> Option<ContentItem> {
    let obj = value.as_object()?;
    let id = id_field(obj, ITEM_ID_KEYS)?;
    let mut item = ContentItem::new(platform, &id);
    item.text = string_field(obj, TEXT_KEYS);
    item.likes = first_counter(value, LIKE_KEYS);
    item.comments = first_counter(value, COMMENT_COUNT_KEYS);
    item.shares = first_counter(value, SHARE_KEYS);
    item.views = first_counter(value, VIEW_KEYS);
    item.published_at = TIME_KEYS.iter().find_map(|k| timestamp(obj.get(*k)?));
    item.author = AUTHOR_KEYS.iter().find_map(|k| account_ref(obj.get(*k)?));
    item.raw = value.clone();
    Some(item)
}

/// An account from either a bare username string or an object.
#[must_use]
pub fn account_ref(value: &Value) -> Option<AccountRef> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(AccountRef {
            username: s.trim().trim_start_matches('@').to_string(),
            display_name: None,
            external_id: None,
        }),
        Value::Object(obj) => {
            let username = string_field(obj, USERNAME_KEYS)?;
            Some(AccountRef {
                username: username.trim_start_matches('@').to_string(),
                display_name: string_field(obj, DISPLAY_NAME_KEYS),
                external_id: id_field(obj, ID_KEYS),
            })
        }
        _ => None,
    }
}

#[must_use]
pub fn comments(item_id: &str, value: Value) -> Vec<Comment> {
    let value = unwrap_envelope(value);
    let Some(items) = list(&value) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|v| {
            let obj = v.as_object()?;
            let text = string_field(obj, &["text", "comment", "body", "content"])?;
            Some(Comment {
                id: id_field(obj, &["id", "cid", "comment_id"]).unwrap_or_default(),
                item_id: item_id.to_string(),
                author: AUTHOR_KEYS
                    .iter()
                    .chain(USERNAME_KEYS)
                    .find_map(|k| account_ref(obj.get(*k)?))
                    .map(|a| a.username),
                text,
                likes: first_counter(v, LIKE_KEYS),
            })
        })
        .collect()
}

/// `None` for a null payload or one without any text.
#[must_use]
pub fn transcript(item_id: &str, value: Value) -> Option<Transcript> {
    let value = unwrap_envelope(value);
    let (text, language) = match &value {
        Value::String(s) => (s.clone(), None),
        Value::Object(obj) => {
            let text = string_field(obj, &["transcript", "text", "content"]).or_else(|| {
                let segments = obj.get("segments")?.as_array()?;
                let joined = segments
                    .iter()
                    .filter_map(|s| s.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined)
            })?;
            (text, string_field(obj, &["language", "lang"]))
        }
        _ => return None,
    };
    Some(Transcript {
        item_id: item_id.to_string(),
        text,
        language,
    })
}

#[must_use]
pub fn search(platform: &str, value: Value) -> SearchResults {
    let value = unwrap_envelope(value);
    let Some(obj) = value.as_object() else {
        return SearchResults::default();
    };
    let channels = ["channels", "users", "accounts"]
        .iter()
        .find_map(|k| obj.get(*k)?.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| profile(platform, "", v.clone()).ok())
                .filter(|p| !p.username.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let content = ["content", "videos", "items", "posts"]
        .iter()
        .find_map(|k| obj.get(*k)?.as_array())
        .map(|arr| arr.iter().filter_map(|v| content_item(platform, v)).collect())
        .unwrap_or_default();
    SearchResults { channels, content }
}

#[must_use]
pub fn demographics(value: Value) -> DemographicEstimate {
    let value = unwrap_envelope(value);
    let age = first_counter(&value, &["age", "estimated_age"]).and_then(|n| u32::try_from(n).ok());
    let gender = value
        .as_object()
        .and_then(|obj| string_field(obj, &["gender", "sex"]));
    DemographicEstimate { age, gender }
}

fn list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(obj) => LIST_KEYS.iter().find_map(|k| obj.get(*k)?.as_array()),
        _ => None,
    }
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        obj.get(*k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Identifiers arrive as strings or numbers.
fn id_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn bool_field(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|k| obj.get(*k)?.as_bool())
        .unwrap_or(false)
}

/// RFC 3339 strings or Unix epoch seconds.
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        _ => None,
    }
}
