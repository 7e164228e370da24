//! Outbound-link extraction from link-aggregator pages.

use serde_json::Value;

/// Keys whose URLs point at page chrome rather than outbound links.
const SKIPPED_KEYS: &[&str] = &["avatar", "image", "thumbnail", "icon", "profile_pic", "banner"];

/// Collects every `http(s)` URL in `raw`, depth-first in document order,
/// without duplicates. URLs under image-like keys are ignored.
#[must_use]
pub fn extract_links(raw: &Value) -> Vec<String> {
    let mut links = Vec::new();
    walk(raw, &mut links);
    links
}

fn walk(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if is_http_url(s) && !out.iter().any(|l| l == s) {
                out.push(s.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(map) => {
            for (key, v) in map {
                let key = key.to_lowercase();
                if SKIPPED_KEYS.iter().any(|k| key.contains(k)) {
                    continue;
                }
                walk(v, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn is_http_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")) && !s.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_links_in_order_without_duplicates() {
        let raw = json!({
            "title": "my links",
            "links": [
                { "title": "YouTube", "url": "https://youtube.com/@someone" },
                { "title": "Shop", "url": "https://amzn.to/abc" },
                { "title": "Again", "url": "https://youtube.com/@someone" }
            ],
            "socials": { "tiktok": "http://tiktok.com/@someone" }
        });
        let links = extract_links(&raw);
        assert_eq!(
            links,
            vec![
                "https://youtube.com/@someone",
                "https://amzn.to/abc",
                "http://tiktok.com/@someone",
            ]
        );
    }

    #[test]
    fn skips_image_keys_and_non_urls() {
        let raw = json!({
            "avatar_url": "https://cdn.example.com/a.png",
            "background_image": "https://cdn.example.com/bg.png",
            "bio": "not a link",
            "note": "https://has space.com",
            "count": 3
        });
        assert!(extract_links(&raw).is_empty());
    }
}
