use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Closed set of labels a run may attach to an issue.
pub enum Classification {
    Bug,
    Feature,
    Question,
}

impl Classification {
    pub const ALL: [Classification; 3] = [Self::Bug, Self::Feature, Self::Question];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Question => "question",
        }
    }

    /// Case-insensitive match against the label set.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn classification_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)classification\s*:\s*([a-z0-9_-]+)").expect("valid regex")
    })
}

/// Fallback extractor for `classification: <label>` written in free text.
/// Only the first occurrence is considered.
pub fn extract_classification_from_text(text: &str) -> Option<Classification> {
    let captures = classification_pattern().captures(text)?;
    Classification::parse(captures.get(1)?.as_str())
}
