//! Platform mentions in bio text.

use std::sync::LazyLock;

use regex::Regex;

use dossier_core::{PlatformCapability, PotentialMatch};

/// Confidence given to a platform inferred only from a bio mention.
pub const MENTION_CONFIDENCE: f32 = 0.3;

/// Characters of context kept on each side of a mention.
const EXCERPT_RADIUS: usize = 40;

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_.]{2,30})").expect("valid regex"));

/// Matcher for one platform's mention terms (key, display name, aliases).
pub struct MentionMatcher {
    platform: String,
    pattern: Regex,
}

impl MentionMatcher {
    /// `None` when the platform has no usable terms.
    #[must_use]
    pub fn new(capability: &PlatformCapability) -> Option<Self> {
        let terms = capability.mention_terms();
        if terms.is_empty() {
            return None;
        }
        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()?;
        Some(Self {
            platform: capability.key.clone(),
            pattern,
        })
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// First mention of this platform in `bio`, as a potential match.
    #[must_use]
    pub fn find(&self, bio: &str, source_platform: &str) -> Option<PotentialMatch> {
        let m = self.pattern.find(bio)?;
        let evidence = excerpt(bio, m.start(), m.end());
        Some(PotentialMatch {
            platform: self.platform.clone(),
            source_platform: source_platform.to_string(),
            suggested_handle: suggested_handle(&evidence),
            evidence,
            confidence: MENTION_CONFIDENCE,
        })
    }
}

/// Text around `[start, end)` widened by [`EXCERPT_RADIUS`] characters.
fn excerpt(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(EXCERPT_RADIUS - 1)
        .map_or(0, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(EXCERPT_RADIUS)
        .map_or(text.len(), |(i, _)| end + i);
    text[from..to].trim().to_string()
}

/// First `@handle` in the excerpt.
fn suggested_handle(evidence: &str) -> Option<String> {
    HANDLE_RE
        .captures(evidence)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
}
