//! The core entry point: `build_diff_context`.
//!
//! Ported from the reference implementation's `__init__.py::build_diff_context`
//! and its helpers (`_find_core_for_hunk`, `_collect_expansion_files`).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::diffctx::concepts::concepts_from_diff_text;
use crate::diffctx::edges::{self, BuildContext};
use crate::diffctx::fragments::{self, default_registry, enclosing_fragment};
use crate::diffctx::graph::Graph;
use crate::diffctx::ppr::personalized_pagerank;
use crate::diffctx::render::{build_partial_tree, DiffContext};
use crate::diffctx::select::{select, TerminationReason};
use crate::diffctx::types::{DiffHunk, Fragment, FragmentId};
use crate::diffctx::universe::expand_by_rare_identifiers;
use crate::error::{ContextSmithError, Result};
use crate::git;
use crate::tokens::estimate_tokens_default;

const SENTINEL_BUDGET: usize = usize::MAX / 2;
const MAX_SCANNED_UNIVERSE_FILES: usize = 2000;

/// Parameters for [`build_diff_context`], mirroring the public entry point's
/// signature.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub range: String,
    pub budget_tokens: Option<usize>,
    pub alpha: f64,
    pub tau: f64,
    pub no_content: bool,
    pub ignore_file: Option<PathBuf>,
    pub no_default_ignores: bool,
    pub full: bool,
    pub reserve_tokens_per_fragment: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            range: "HEAD".to_string(),
            budget_tokens: None,
            alpha: 0.60,
            tau: 0.08,
            no_content: false,
            ignore_file: None,
            no_default_ignores: false,
            full: false,
            reserve_tokens_per_fragment: 12,
        }
    }
}

/// Build a diff-context bundle for `root` at `options.range`.
pub fn build_diff_context(root: &Path, options: &BuildOptions) -> Result<DiffContext> {
    validate(options)?;

    if !git::is_repository(root) {
        return Err(ContextSmithError::Git {
            message: format!("'{}' is not a git repository", root.display()),
        });
    }

    let hunks = git::parse_diff(root, &options.range)?;
    if hunks.is_empty() {
        info!("empty diff for range '{}'", options.range);
        return Ok(build_partial_tree(root, Vec::new(), options.no_content));
    }

    let changed_files = git::changed_files(root, &options.range)?;
    let registry = default_registry();

    if options.full {
        return Ok(build_full_context(root, &changed_files, &registry, options));
    }

    let diff_text = git::diff_text(root, &options.range)?;
    let diff_concepts = concepts_from_diff_text(&diff_text);

    // --- Fragment changed files ---
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut by_path_name: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for path in &changed_files {
        fragment_into(root, path, &registry, &mut fragments, &mut by_path_name);
    }

    // --- Core fragment identification, one per hunk ---
    let core_ids = find_core_ids(&hunks, &fragments, &by_path_name);

    // --- Universe expansion ---
    let ctx = BuildContext::new(root, &fragments, &by_path_name);
    let builders = edges::default_builders();
    let discovered = edges::discover_all_related_files(&builders, &ctx, &changed_files);

    let universe_files = list_repository_files(root, options);
    let rare_expansion = expand_by_rare_identifiers(&diff_concepts, &universe_files, |p| {
        std::fs::read_to_string(root.join(p)).ok()
    });

    let mut already: HashSet<PathBuf> = changed_files.iter().cloned().collect();
    for path in discovered.into_iter().chain(rare_expansion.into_iter()) {
        if already.insert(path.clone()) {
            fragment_into(root, &path, &registry, &mut fragments, &mut by_path_name);
        }
    }

    // --- Token counts ---
    for frag in &mut fragments {
        frag.token_count = estimate_tokens_default(&frag.content) + options.reserve_tokens_per_fragment;
    }

    // --- Graph + PPR ---
    let ctx = BuildContext::new(root, &fragments, &by_path_name);
    let edge_map = edges::collect_all_edges(&builders, &ctx, false);
    let node_ids: Vec<FragmentId> = fragments.iter().map(|f| f.id.clone()).collect();
    let graph = Graph::build(node_ids, edge_map);
    let relevance = personalized_pagerank(&graph, &core_ids, options.alpha);

    // --- Concepts for the utility model (fallback to fragments' own identifiers) ---
    let concepts: Vec<String> = if diff_concepts.is_empty() {
        fragments.iter().flat_map(|f| f.identifiers.iter().cloned()).collect::<HashSet<_>>().into_iter().collect()
    } else {
        diff_concepts.into_iter().collect()
    };

    let budget = options.budget_tokens.unwrap_or(SENTINEL_BUDGET);
    let result = select(&fragments, &core_ids, &relevance, concepts, budget, options.tau);
    log_termination(&result.reason);

    let by_id: HashMap<&FragmentId, &Fragment> = fragments.iter().map(|f| (&f.id, f)).collect();
    let selected: Vec<Fragment> = result
        .selected
        .iter()
        .filter_map(|id| by_id.get(id).map(|f| (*f).clone()))
        .collect();

    Ok(build_partial_tree(root, selected, options.no_content))
}

fn validate(options: &BuildOptions) -> Result<()> {
    if !(0.0 < options.alpha && options.alpha < 1.0) {
        return Err(ContextSmithError::validation("alpha", "must be strictly between 0 and 1"));
    }
    if options.tau < 0.0 {
        return Err(ContextSmithError::validation("tau", "must be non-negative"));
    }
    if let Some(budget) = options.budget_tokens {
        if budget == 0 {
            return Err(ContextSmithError::validation("budget_tokens", "must be greater than 0"));
        }
    }
    Ok(())
}

fn log_termination(reason: &TerminationReason) {
    match reason {
        TerminationReason::BudgetExhausted => debug!("selector stopped: budget exhausted"),
        TerminationReason::StoppedByTau => debug!("selector stopped: tau threshold reached"),
        TerminationReason::NoCandidates => debug!("selector stopped: no candidates"),
        TerminationReason::NoUtility => debug!("selector stopped: no utility gain available"),
        TerminationReason::BestSingleton => debug!("selector stopped: singleton override"),
    }
}

fn fragment_into(
    root: &Path,
    path: &Path,
    registry: &[Box<dyn fragments::Fragmenter>],
    out: &mut Vec<Fragment>,
    by_path: &mut HashMap<PathBuf, Vec<usize>>,
) {
    let abs = root.join(path);
    let content = match std::fs::read_to_string(&abs) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable file");
            return;
        }
    };
    if content.as_bytes().iter().take(8192).any(|&b| b == 0) {
        debug!(path = %path.display(), "skipping binary file");
        return;
    }

    let frags = fragments::fragment_file(registry, path, &content);
    let start = out.len();
    out.extend(frags);
    let indices: Vec<usize> = (start..out.len()).collect();
    by_path.entry(path.to_path_buf()).or_default().extend(indices);
}

/// Per-hunk core-fragment selection: smallest containing fragment; else
/// every overlapping fragment; else the enclosing fragment; else the
/// nearest fragment before/after the hunk.
fn find_core_ids(
    hunks: &[DiffHunk],
    fragments: &[Fragment],
    by_path: &HashMap<PathBuf, Vec<usize>>,
) -> Vec<FragmentId> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    for hunk in hunks {
        let Some(indices) = by_path.get(&hunk.path) else { continue };
        let file_frags: Vec<&Fragment> = indices.iter().map(|&i| &fragments[i]).collect();
        let (start, end) = hunk.core_selection_range();

        let containing: Vec<&&Fragment> = file_frags
            .iter()
            .filter(|f| f.start_line() <= start && end <= f.end_line())
            .collect();

        if let Some(smallest) = containing.iter().min_by_key(|f| f.line_count()) {
            if seen.insert(smallest.id.clone()) {
                ids.push(smallest.id.clone());
            }
            continue;
        }

        let overlapping: Vec<&&Fragment> = file_frags
            .iter()
            .filter(|f| f.start_line() <= end && start <= f.end_line())
            .collect();
        if !overlapping.is_empty() {
            for f in overlapping {
                if seen.insert(f.id.clone()) {
                    ids.push(f.id.clone());
                }
            }
            continue;
        }

        let owned: Vec<Fragment> = file_frags.iter().map(|f| (**f).clone()).collect();
        if let Some(enclosing) = enclosing_fragment(&owned, start) {
            if seen.insert(enclosing.id.clone()) {
                ids.push(enclosing.id.clone());
            }
            continue;
        }

        let before = file_frags.iter().filter(|f| f.end_line() < start).max_by_key(|f| f.end_line());
        let after = file_frags.iter().filter(|f| f.start_line() > end).min_by_key(|f| f.start_line());
        for f in before.into_iter().chain(after.into_iter()) {
            if seen.insert(f.id.clone()) {
                ids.push(f.id.clone());
            }
        }
    }

    ids
}

fn build_full_context(
    root: &Path,
    changed_files: &[PathBuf],
    registry: &[Box<dyn fragments::Fragmenter>],
    options: &BuildOptions,
) -> DiffContext {
    let mut fragments = Vec::new();
    let mut by_path = HashMap::new();
    for path in changed_files {
        fragment_into(root, path, registry, &mut fragments, &mut by_path);
    }
    fragments.sort_by(|a, b| a.path().cmp(b.path()).then(a.start_line().cmp(&b.start_line())));
    build_partial_tree(root, fragments, options.no_content)
}

/// Walk the repository collecting candidate file paths for rare-identifier
/// expansion, honoring ignore rules. Mirrors the directory-walk
/// collaborator used elsewhere in this crate (`scanner.rs`), scoped here
/// to the diff-context pipeline's own cap.
fn list_repository_files(root: &Path, options: &BuildOptions) -> Vec<PathBuf> {
    let mut builder = ignore::WalkBuilder::new(root);
    builder.hidden(false).git_ignore(!options.no_default_ignores);
    if let Some(ignore_file) = &options.ignore_file {
        builder.add_ignore(ignore_file);
    }

    let mut out = Vec::new();
    for entry in builder.build() {
        if out.len() >= MAX_SCANNED_UNIVERSE_FILES {
            break;
        }
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        out.push(rel.to_path_buf());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_alpha_out_of_range() {
        let mut options = BuildOptions::default();
        options.alpha = 1.0;
        assert!(validate(&options).is_err());
    }

    #[test]
    fn validate_rejects_negative_tau() {
        let mut options = BuildOptions::default();
        options.tau = -0.1;
        assert!(validate(&options).is_err());
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let mut options = BuildOptions::default();
        options.budget_tokens = Some(0);
        assert!(validate(&options).is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&BuildOptions::default()).is_ok());
    }
}
