//! Lazy-greedy submodular selector.
//!
//! Ported from `select.py`: core phase, lazy-greedy baseline phase with
//! upper-bound pruning, τ-stopping rule, and the singleton-improvement
//! override.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::diffctx::types::{Fragment, FragmentId};
use crate::diffctx::utility::{density, UtilityState};

const TAU_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    BudgetExhausted,
    StoppedByTau,
    NoCandidates,
    NoUtility,
    BestSingleton,
}

pub struct SelectionResult {
    pub selected: Vec<FragmentId>,
    pub reason: TerminationReason,
}

/// Run the selector. `fragments` is the full universe; `core_ids` are the
/// fragments intersecting a diff hunk; `relevance` is the PPR score per
/// fragment id (missing entries treated as 0); `concepts` seeds the
/// utility model (diff concepts, or each fragment's own identifiers when
/// the diff yielded none).
pub fn select(
    fragments: &[Fragment],
    core_ids: &[FragmentId],
    relevance: &HashMap<FragmentId, f64>,
    concepts: Vec<String>,
    budget_tokens: usize,
    tau: f64,
) -> SelectionResult {
    let by_id: HashMap<&FragmentId, &Fragment> = fragments.iter().map(|f| (&f.id, f)).collect();
    let core_set: HashSet<&FragmentId> = core_ids.iter().collect();

    let mut state = UtilityState::new(concepts);
    let mut selected: Vec<FragmentId> = Vec::new();
    let mut selected_ranges: Vec<(std::path::PathBuf, usize, usize)> = Vec::new();
    let mut budget_remaining = budget_tokens;

    // --- Core phase ---
    let mut core_frags: Vec<&Fragment> = core_ids.iter().filter_map(|id| by_id.get(id).copied()).collect();
    core_frags.sort_by_key(|f| (f.token_count, f.line_count(), f.start_line()));

    for frag in core_frags {
        if subset_of_selected(frag, &selected_ranges) {
            continue;
        }
        if frag.token_count > budget_remaining {
            debug!(fragment = %frag.id, "core fragment skipped: exceeds remaining budget");
            continue;
        }
        let rel = relevance.get(&frag.id).copied().unwrap_or(0.0);
        state.apply_fragment(frag, rel);
        budget_remaining -= frag.token_count;
        selected.push(frag.id.clone());
        selected_ranges.push((frag.path().to_path_buf(), frag.start_line(), frag.end_line()));
    }

    // --- Candidate set for the greedy phase ---
    // Excludes anything overlapping an already-selected (core) range up
    // front, so neither the singleton baseline nor the greedy loop can pick
    // a fragment that duplicates core content.
    let mut candidates: Vec<&Fragment> = fragments
        .iter()
        .filter(|f| !core_set.contains(&f.id) && f.token_count > 0 && !overlaps_selected(f, &selected_ranges))
        .collect();

    if candidates.is_empty() {
        return SelectionResult { selected, reason: TerminationReason::NoCandidates };
    }

    // Singleton improvement baseline: best single non-core fragment under
    // the post-core state alone.
    let singleton = candidates
        .iter()
        .map(|f| {
            let rel = relevance.get(&f.id).copied().unwrap_or(0.0);
            let gain = state.marginal_gain(f, rel);
            (*f, gain, rel)
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    let Some((singleton_frag, singleton_gain, _)) = singleton else {
        return SelectionResult { selected, reason: TerminationReason::NoCandidates };
    };

    if singleton_gain <= 0.0 {
        return SelectionResult { selected, reason: TerminationReason::NoUtility };
    }

    let utility_after_core = state.current_utility();

    // --- Lazy-greedy baseline/greedy phase (CELF-style) ---
    let mut bounds: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let rel = relevance.get(&f.id).copied().unwrap_or(0.0);
            let gain = state.marginal_gain(f, rel);
            (i, density(gain, f.token_count))
        })
        .collect();

    let mut greedy_selected: Vec<FragmentId> = Vec::new();
    let mut greedy_densities: Vec<f64> = Vec::new();
    let mut tau_threshold: Option<f64> = None;
    let mut reason = TerminationReason::BudgetExhausted;

    loop {
        if bounds.is_empty() {
            reason = TerminationReason::NoCandidates;
            break;
        }
        bounds.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let (idx, stored_bound) = bounds[0];
        let frag = candidates[idx];

        if frag.token_count > budget_remaining {
            bounds.remove(0);
            continue;
        }
        if overlaps_selected(frag, &selected_ranges) {
            bounds.remove(0);
            continue;
        }

        let rel = relevance.get(&frag.id).copied().unwrap_or(0.0);
        let actual_gain = state.marginal_gain(frag, rel);
        let actual_density = density(actual_gain, frag.token_count);

        let next_bound = bounds.get(1).map(|(_, b)| *b).unwrap_or(f64::MIN);

        if actual_density >= next_bound {
            if let Some(threshold) = tau_threshold {
                if actual_density < threshold {
                    reason = TerminationReason::StoppedByTau;
                    break;
                }
            }

            state.apply_fragment(frag, rel);
            budget_remaining -= frag.token_count;
            selected.push(frag.id.clone());
            selected_ranges.push((frag.path().to_path_buf(), frag.start_line(), frag.end_line()));
            greedy_selected.push(frag.id.clone());
            greedy_densities.push(actual_density);
            bounds.remove(0);

            if greedy_densities.len() == TAU_WINDOW {
                tau_threshold = Some(tau * median(&greedy_densities));
            }
        } else {
            bounds[0].1 = actual_density;
        }
    }

    // --- Singleton-improvement override ---
    let greedy_gain_over_core = state.current_utility() - utility_after_core;

    if singleton_gain > greedy_gain_over_core {
        let core_only: Vec<FragmentId> = selected
            .iter()
            .filter(|id| !greedy_selected.contains(id))
            .cloned()
            .collect();
        let mut final_selected = core_only;
        final_selected.push(singleton_frag.id.clone());
        return SelectionResult { selected: final_selected, reason: TerminationReason::BestSingleton };
    }

    SelectionResult { selected, reason }
}

fn subset_of_selected(frag: &Fragment, selected_ranges: &[(std::path::PathBuf, usize, usize)]) -> bool {
    selected_ranges
        .iter()
        .any(|(path, start, end)| path == frag.path() && *start <= frag.start_line() && frag.end_line() <= *end)
}

/// True if `frag`'s range overlaps any already-selected range in the same
/// file (not just subset-containment): `cand.start < sel.end && sel.start <
/// cand.end`.
fn overlaps_selected(frag: &Fragment, selected_ranges: &[(std::path::PathBuf, usize, usize)]) -> bool {
    selected_ranges
        .iter()
        .any(|(path, start, end)| path == frag.path() && frag.start_line() < *end && *start < frag.end_line())
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffctx::types::FragmentKind;

    fn frag(path: &str, start: usize, end: usize, symbol: Option<&str>, tokens: usize) -> Fragment {
        let mut f = Fragment::new(
            FragmentId::new(path, start, end),
            FragmentKind::Function,
            String::new(),
            symbol.map(|s| vec![s.to_string()]).unwrap_or_default(),
        );
        f.token_count = tokens;
        if let Some(s) = symbol {
            f = f.with_symbol(s);
        }
        f
    }

    #[test]
    fn core_fragments_exceeding_budget_are_skipped_not_errors() {
        let fragments = vec![
            frag("a.rs", 1, 5, Some("alpha"), 100),
            frag("b.rs", 1, 5, Some("beta"), 100),
        ];
        let core_ids: Vec<_> = fragments.iter().map(|f| f.id.clone()).collect();
        let relevance = HashMap::new();
        let result = select(&fragments, &core_ids, &relevance, vec!["alpha".into()], 150, 0.08);
        assert_eq!(result.selected.len(), 1);
    }

    #[test]
    fn no_candidates_after_core_returns_no_candidates_reason() {
        let fragments = vec![frag("a.rs", 1, 5, Some("alpha"), 10)];
        let core_ids = vec![fragments[0].id.clone()];
        let relevance = HashMap::new();
        let result = select(&fragments, &core_ids, &relevance, vec!["alpha".into()], 1000, 0.08);
        assert_eq!(result.reason, TerminationReason::NoCandidates);
    }

    #[test]
    fn greedy_phase_skips_overlapping_not_just_subset_ranges() {
        // Two non-core fragments in the same file with overlapping (not
        // subset) ranges and equal density: whichever the greedy loop
        // admits first must block the other via range overlap, not merely
        // via subset-containment (which `overlaps_selected` generalizes).
        let fragments = vec![frag("a.rs", 1, 10, Some("alpha"), 5), frag("a.rs", 5, 15, Some("beta"), 5)];
        let relevance: HashMap<FragmentId, f64> =
            fragments.iter().map(|f| (f.id.clone(), 1.0)).collect();
        let result = select(&fragments, &[], &relevance, vec!["alpha".into(), "beta".into()], 1000, 0.08);
        assert_eq!(result.selected.len(), 1);
    }

    #[test]
    fn median_is_correct_for_even_and_odd() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
