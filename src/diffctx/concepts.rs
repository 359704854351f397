//! Identifier and concept extraction.
//!
//! Mirrors the original source's `types.extract_identifiers` /
//! `utility.concepts_from_diff_text`: identifiers are runs matching
//! `[A-Za-z_]\w*`, lowercased, filtered by a minimum length and a
//! stopword set that varies by content profile.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z_]\w*").unwrap());

/// Which stopword/min-length profile applies to a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Source code: short identifiers are common and meaningful.
    Code,
    /// Prose documentation: filter common English words.
    Docs,
    /// Structured data (config keys): filter common config nouns.
    Data,
}

impl Profile {
    pub fn min_len(self) -> usize {
        match self {
            Self::Code => 3,
            Self::Docs => 3,
            Self::Data => 3,
        }
    }

    fn stopwords(self) -> &'static [&'static str] {
        match self {
            Self::Code => &CODE_STOPWORDS,
            Self::Docs => &DOC_STOPWORDS,
            Self::Data => &DATA_STOPWORDS,
        }
    }
}

const CODE_STOPWORDS: [&str; 24] = [
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old",
];

const DOC_STOPWORDS: [&str; 20] = [
    "the", "and", "for", "are", "but", "not", "you", "all", "this", "that", "with", "from",
    "have", "will", "your", "into", "than", "then", "also", "such",
];

const DATA_STOPWORDS: [&str; 10] = [
    "true", "false", "null", "none", "default", "value", "name", "type", "list", "dict",
];

/// Extract the lowercase identifier *set* from `text` under `profile`.
pub fn extract_identifiers(text: &str, profile: Profile) -> HashSet<String> {
    let min_len = profile.min_len();
    let stopwords: HashSet<&str> = profile.stopwords().iter().copied().collect();
    IDENT_RE
        .find_iter(text)
        .filter_map(|m| {
            let ident = m.as_str();
            if ident.chars().count() < min_len {
                return None;
            }
            let lower = ident.to_lowercase();
            if stopwords.contains(lower.as_str()) {
                None
            } else {
                Some(lower)
            }
        })
        .collect()
}

/// Extract the identifier *list* (duplicates kept, order preserved), used
/// by TF term-frequency counting.
pub fn extract_identifier_list(text: &str, profile: Profile) -> Vec<String> {
    let min_len = profile.min_len();
    let stopwords: HashSet<&str> = profile.stopwords().iter().copied().collect();
    IDENT_RE
        .find_iter(text)
        .filter_map(|m| {
            let ident = m.as_str();
            if ident.chars().count() < min_len {
                return None;
            }
            let lower = ident.to_lowercase();
            if stopwords.contains(lower.as_str()) {
                None
            } else {
                Some(lower)
            }
        })
        .collect()
}

/// Extract the diff's "concepts": identifiers on added/removed lines only
/// (excluding the `+++`/`---` path-header lines), lowercase, ≥3 chars,
/// minus code stopwords.
pub fn concepts_from_diff_text(diff_text: &str) -> HashSet<String> {
    let mut changed = String::new();
    for line in diff_text.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            changed.push_str(rest);
            changed.push('\n');
        } else if let Some(rest) = line.strip_prefix('-') {
            changed.push_str(rest);
            changed.push('\n');
        }
    }
    extract_identifiers(&changed, Profile::Code)
}
