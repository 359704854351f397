//! Universe expansion: widen the candidate set beyond the diff's changed
//! files via edge-driven discovery and rare-identifier inverted-index
//! expansion.
//!
//! Ported from `edges/__init__.py`'s `_collect_expansion_files`/
//! `_build_ident_index`/`_expand_universe_by_rare_identifiers`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

const RARE_THRESHOLD: usize = 6;
const MIN_CONCEPT_LEN: usize = 4;
const MAX_EXPANSION_FILES: usize = 50;
const MAX_SCANNED_FILES: usize = 2000;

/// From `diff_concepts`, scan up to [`MAX_SCANNED_FILES`] candidate
/// repository files (already discovered by the caller's directory walk,
/// respecting ignore rules) and return files that look uniquely relevant:
/// they contain a concept whose whole-repo posting list has between 1 and
/// [`RARE_THRESHOLD`] hits.
pub fn expand_by_rare_identifiers(
    diff_concepts: &HashSet<String>,
    candidate_files: &[PathBuf],
    read_file: impl Fn(&Path) -> Option<String>,
) -> Vec<PathBuf> {
    let rare_concepts: Vec<&String> = diff_concepts.iter().filter(|c| c.chars().count() >= MIN_CONCEPT_LEN).collect();
    if rare_concepts.is_empty() {
        return Vec::new();
    }

    // BTreeMap keyed by the (sorted) concept string keeps iteration order
    // independent of hash-seed randomization, so truncation below is
    // deterministic across process invocations.
    let mut index: BTreeMap<&str, Vec<&Path>> = BTreeMap::new();
    let scanned: Vec<&PathBuf> = candidate_files.iter().take(MAX_SCANNED_FILES).collect();

    for path in &scanned {
        let Some(content) = read_file(path) else { continue };
        let lower = content.to_lowercase();
        for concept in &rare_concepts {
            if lower.contains(concept.as_str()) {
                index.entry(concept.as_str()).or_default().push(path);
            }
        }
    }

    let mut expansion: Vec<PathBuf> = Vec::new();
    let mut seen = HashSet::new();
    for (_, postings) in index {
        if postings.is_empty() || postings.len() > RARE_THRESHOLD {
            continue;
        }
        let mut sorted_postings = postings;
        sorted_postings.sort();
        for path in sorted_postings {
            if seen.insert(path.to_path_buf()) {
                expansion.push(path.to_path_buf());
            }
        }
    }
    expansion.sort();

    if expansion.len() > MAX_EXPANSION_FILES {
        debug!(
            dropped = expansion.len() - MAX_EXPANSION_FILES,
            "rare-identifier expansion truncated to cap"
        );
        expansion.truncate(MAX_EXPANSION_FILES);
    }
    expansion
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn rare_identifier_expansion_skips_common_concepts() {
        let mut concepts = HashSet::new();
        concepts.insert("calculate_tax".to_string());
        let files = vec![PathBuf::from("a.rs"), PathBuf::from("b.rs"), PathBuf::from("c.rs")];
        let contents: HashMap<PathBuf, &str> = [
            (PathBuf::from("a.rs"), "fn calculate_tax() {}"),
            (PathBuf::from("b.rs"), "no match here"),
            (PathBuf::from("c.rs"), "no match here either"),
        ]
        .into_iter()
        .collect();
        let expanded = expand_by_rare_identifiers(&concepts, &files, |p| contents.get(p).map(|s| s.to_string()));
        assert_eq!(expanded, vec![PathBuf::from("a.rs")]);
    }

    #[test]
    fn short_concepts_are_excluded() {
        let mut concepts = HashSet::new();
        concepts.insert("amt".to_string());
        let files = vec![PathBuf::from("a.rs")];
        let expanded = expand_by_rare_identifiers(&concepts, &files, |_| Some("amt amt amt".to_string()));
        assert!(expanded.is_empty());
    }
}
